//! Markdown-backed handlers
//!
//! Skills, sub-agents, rules, commands and agents are stored as markdown
//! files with YAML frontmatter. Every field except `content` goes into the
//! frontmatter; the body is the `content`.
//!
//! | Type | Path |
//! |---|---|
//! | skill | `.claude/skills/<category>/<name>/SKILL.md` |
//! | sub-agent | `.claude/agents/<name>.md` |
//! | rule | `.claude/rules/<name>.md` |
//! | command | `.claude/commands/<name>.md` |
//! | agent | `.agents/<name>.md` |

use crate::error::HandlerError;
use crate::frontmatter::{self, Document};
use crate::handler::{
    ensure_type, ArtifactHandler, CreateOptions, DeleteOptions, HandlerResult, ReadOptions,
    Stored, UpdateOptions,
};
use crate::trash;
use acf_artifact::{split_skill_id, Artifact, ArtifactChanges, ArtifactType};
use async_trait::async_trait;
use serde_json::Value as JsonValue;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// File name of a skill inside its directory
pub const SKILL_FILE: &str = "SKILL.md";

/// How ids map onto files
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Layout {
    /// `<dir>/<name>.md`
    Flat,
    /// `<dir>/<category>/<name>/SKILL.md`
    Nested,
}

/// Handler for markdown + frontmatter artifacts
#[derive(Debug, Clone)]
pub struct MarkdownHandler {
    artifact_type: ArtifactType,
    dir: PathBuf,
    layout: Layout,
}

impl MarkdownHandler {
    /// Skills under `.claude/skills`
    #[must_use]
    pub fn skills() -> Self {
        Self {
            artifact_type: ArtifactType::Skill,
            dir: PathBuf::from(".claude/skills"),
            layout: Layout::Nested,
        }
    }

    /// Sub-agents under `.claude/agents`
    #[must_use]
    pub fn sub_agents() -> Self {
        Self::flat(ArtifactType::SubAgent, ".claude/agents")
    }

    /// Rules under `.claude/rules`
    #[must_use]
    pub fn rules() -> Self {
        Self::flat(ArtifactType::Rule, ".claude/rules")
    }

    /// Commands under `.claude/commands`
    #[must_use]
    pub fn commands() -> Self {
        Self::flat(ArtifactType::Command, ".claude/commands")
    }

    /// Agents under `.agents`
    #[must_use]
    pub fn agents() -> Self {
        Self::flat(ArtifactType::Agent, ".agents")
    }

    fn flat(artifact_type: ArtifactType, dir: &str) -> Self {
        Self {
            artifact_type,
            dir: PathBuf::from(dir),
            layout: Layout::Flat,
        }
    }

    /// Directory holding this type, relative to the project root
    #[inline]
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File backing `id`
    ///
    /// # Errors
    /// Returns `HandlerError::InvalidInput` for ids that are not plain names
    pub fn path_for(&self, root: &Path, id: &str) -> Result<PathBuf, HandlerError> {
        let base = root.join(&self.dir);
        match self.layout {
            Layout::Nested => {
                let (category, name) = split_skill_id(id)?;
                check_segment(category)?;
                check_segment(name)?;
                Ok(base.join(category).join(name).join(SKILL_FILE))
            }
            Layout::Flat => {
                check_segment(id)?;
                Ok(base.join(format!("{id}.md")))
            }
        }
    }

    /// Fields carried by the path rather than the frontmatter
    fn path_fields(&self) -> &'static [&'static str] {
        match self.layout {
            Layout::Nested => &["category", "name"],
            Layout::Flat => &[],
        }
    }

    fn render(&self, artifact: &Artifact) -> Result<String, HandlerError> {
        let JsonValue::Object(mut fields) = artifact.to_json() else {
            return Err(HandlerError::Serialization(format!(
                "{} payload is not an object",
                self.artifact_type
            )));
        };
        let body = match fields.remove("content") {
            Some(JsonValue::String(body)) => body,
            _ => String::new(),
        };
        for key in self.path_fields() {
            fields.remove(*key);
        }
        frontmatter::render(&Document { fields, body }).map_err(HandlerError::Serialization)
    }

    fn hydrate(&self, id: &str, path: &Path, source: &str) -> Result<Artifact, HandlerError> {
        let Document { mut fields, body } =
            frontmatter::parse(source).map_err(|e| HandlerError::parse_error(path, e))?;

        fields.insert("content".to_string(), JsonValue::String(body));
        match self.layout {
            Layout::Nested => {
                let (category, name) = split_skill_id(id)?;
                fields.insert("category".to_string(), category.into());
                fields.insert("name".to_string(), name.into());
            }
            Layout::Flat => {
                let named = fields.contains_key("name") || fields.contains_key("id");
                if !named {
                    fields.insert("name".to_string(), id.into());
                }
            }
        }

        Artifact::from_json(self.artifact_type, JsonValue::Object(fields))
            .map_err(|e| HandlerError::parse_error(path, e.to_string()))
    }

    async fn load(&self, root: &Path, id: &str) -> Result<(Artifact, PathBuf), HandlerError> {
        let path = self.path_for(root, id)?;
        let source = match tokio::fs::read_to_string(&path).await {
            Ok(source) => source,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(HandlerError::not_found(self.artifact_type, id));
            }
            Err(e) => return Err(HandlerError::io_error(&path, e)),
        };
        Ok((self.hydrate(id, &path, &source)?, path))
    }

    async fn write(&self, path: &Path, artifact: &Artifact) -> Result<(), HandlerError> {
        let text = self.render(artifact)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| HandlerError::io_error(parent, e))?;
        }
        tokio::fs::write(path, text)
            .await
            .map_err(|e| HandlerError::io_error(path, e))
    }

    /// Ids present on disk
    async fn scan(&self, root: &Path) -> Result<Vec<String>, HandlerError> {
        let base = root.join(&self.dir);
        match self.layout {
            Layout::Flat => {
                let files = read_dir_names(&base, false).await?;
                Ok(files
                    .into_iter()
                    .filter_map(|f| f.strip_suffix(".md").map(str::to_string))
                    .collect())
            }
            Layout::Nested => {
                let mut ids = Vec::new();
                for category in read_dir_names(&base, true).await? {
                    for name in read_dir_names(&base.join(&category), true).await? {
                        let file = base.join(&category).join(&name).join(SKILL_FILE);
                        let exists = tokio::fs::try_exists(&file)
                            .await
                            .map_err(|e| HandlerError::io_error(&file, e))?;
                        if exists {
                            ids.push(format!("{category}/{name}"));
                        }
                    }
                }
                Ok(ids)
            }
        }
    }
}

fn check_segment(segment: &str) -> Result<(), HandlerError> {
    if segment.is_empty() || segment == "." || segment == ".." || segment.contains(['/', '\\']) {
        return Err(HandlerError::InvalidInput(format!(
            "'{segment}' is not a valid artifact name"
        )));
    }
    Ok(())
}

/// Entry names in `dir` (directories or files); missing dir is empty
async fn read_dir_names(dir: &Path, directories: bool) -> Result<Vec<String>, HandlerError> {
    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(HandlerError::io_error(dir, e)),
    };

    let mut names = Vec::new();
    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| HandlerError::io_error(dir, e))?
    {
        let file_type = entry
            .file_type()
            .await
            .map_err(|e| HandlerError::io_error(entry.path(), e))?;
        if file_type.is_dir() != directories {
            continue;
        }
        if let Some(name) = entry.file_name().to_str() {
            if !name.starts_with('.') {
                names.push(name.to_string());
            }
        }
    }
    Ok(names)
}

#[async_trait]
impl ArtifactHandler for MarkdownHandler {
    fn artifact_type(&self) -> ArtifactType {
        self.artifact_type
    }

    async fn create(
        &self,
        root: &Path,
        artifact: &Artifact,
        options: &CreateOptions,
    ) -> HandlerResult<Artifact> {
        ensure_type(self.artifact_type, artifact)?;
        artifact.validate()?;

        let id = artifact.id();
        let path = self.path_for(root, &id)?;
        let exists = tokio::fs::try_exists(&path)
            .await
            .map_err(|e| HandlerError::io_error(&path, e))?;
        if exists && !options.overwrite {
            return Err(HandlerError::already_exists(self.artifact_type, id, Some(path)));
        }

        if !options.dry_run {
            self.write(&path, artifact).await?;
        }
        Ok(Stored::at(artifact.clone(), path))
    }

    async fn read(&self, root: &Path, id: &str, options: &ReadOptions) -> HandlerResult<Artifact> {
        let (artifact, path) = self.load(root, id).await?;
        let artifact = if options.include_content {
            artifact
        } else {
            artifact.without_content()
        };
        Ok(Stored::at(artifact, path))
    }

    async fn update(
        &self,
        root: &Path,
        id: &str,
        changes: &ArtifactChanges,
        options: &UpdateOptions,
    ) -> HandlerResult<Artifact> {
        let (current, path) = self.load(root, id).await?;
        let updated = current.apply_changes(changes, options.merge)?;
        updated.validate()?;

        if !options.dry_run {
            self.write(&path, &updated).await?;
        }
        Ok(Stored::at(updated, path))
    }

    async fn delete(&self, root: &Path, id: &str, options: &DeleteOptions) -> HandlerResult<()> {
        let (current, path) = self.load(root, id).await?;
        if options.dry_run {
            return Ok(Stored::at((), path));
        }
        if options.soft {
            trash::stash(root, &current).await?;
        }

        match self.layout {
            Layout::Flat => tokio::fs::remove_file(&path)
                .await
                .map_err(|e| HandlerError::io_error(&path, e))?,
            Layout::Nested => {
                // the whole skill directory goes, including bundled resources
                if let Some(dir) = path.parent() {
                    tokio::fs::remove_dir_all(dir)
                        .await
                        .map_err(|e| HandlerError::io_error(dir, e))?;
                }
            }
        }
        Ok(Stored::at((), path))
    }

    async fn list(&self, root: &Path) -> HandlerResult<Vec<Artifact>> {
        let mut artifacts = Vec::new();
        for id in self.scan(root).await? {
            match self.load(root, &id).await {
                Ok((artifact, _)) => artifacts.push(artifact),
                Err(e) => tracing::warn!("skipping unreadable {} '{}': {}", self.artifact_type, id, e),
            }
        }
        artifacts.sort_by_key(Artifact::id);
        Ok(Stored::at(artifacts, root.join(&self.dir)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use acf_artifact::{Rule, Skill, SubAgent};
    use pretty_assertions::assert_eq;

    fn skill() -> Artifact {
        Skill::new("core", "example", "# Example\n\nDo X.\n")
            .with_description("A")
            .into()
    }

    #[tokio::test]
    async fn create_then_read_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let handler = MarkdownHandler::skills();

        let created = handler
            .create(dir.path(), &skill(), &CreateOptions::new())
            .await
            .unwrap();
        assert_eq!(
            created.path.as_deref(),
            Some(dir.path().join(".claude/skills/core/example/SKILL.md").as_path())
        );

        let read = handler
            .read(dir.path(), "core/example", &ReadOptions::new())
            .await
            .unwrap();
        assert_eq!(read.data, skill());
    }

    #[tokio::test]
    async fn frontmatter_omits_path_fields() {
        let dir = tempfile::tempdir().unwrap();
        let handler = MarkdownHandler::skills();
        handler
            .create(dir.path(), &skill(), &CreateOptions::new())
            .await
            .unwrap();

        let text =
            std::fs::read_to_string(dir.path().join(".claude/skills/core/example/SKILL.md")).unwrap();
        assert!(text.starts_with("---\ndescription: A\n---\n\n# Example"));
        assert!(!text.contains("category"));
    }

    #[tokio::test]
    async fn body_opening_with_fence_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let handler = MarkdownHandler::skills();

        for (name, body) in [
            ("mapping", "---\ntitle: Doc\n---\nbody\n"),
            ("scalar", "---\nplain text\n---\nbody\n"),
        ] {
            let skill: Artifact = Skill::new("core", name, body).into();
            handler.create(dir.path(), &skill, &CreateOptions::new()).await.unwrap();

            let read = handler
                .read(dir.path(), &format!("core/{name}"), &ReadOptions::new())
                .await
                .unwrap();
            assert_eq!(read.data, skill);
        }
        let listed = handler.list(dir.path()).await.unwrap();
        assert_eq!(listed.data.len(), 2);
    }

    #[tokio::test]
    async fn create_refuses_existing_without_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let handler = MarkdownHandler::rules();
        let rule: Artifact = Rule::new("style", "Use tabs").into();

        handler.create(dir.path(), &rule, &CreateOptions::new()).await.unwrap();
        let err = handler
            .create(dir.path(), &rule, &CreateOptions::new())
            .await
            .unwrap_err();
        assert!(matches!(err, HandlerError::AlreadyExists { .. }));

        assert!(handler
            .create(dir.path(), &rule, &CreateOptions::new().overwrite())
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn dry_run_does_not_write() {
        let dir = tempfile::tempdir().unwrap();
        let handler = MarkdownHandler::rules();
        let rule: Artifact = Rule::new("style", "Use tabs").into();

        handler
            .create(dir.path(), &rule, &CreateOptions::new().dry_run())
            .await
            .unwrap();
        let err = handler
            .read(dir.path(), "style", &ReadOptions::new())
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn update_merges_and_persists() {
        let dir = tempfile::tempdir().unwrap();
        let handler = MarkdownHandler::skills();
        handler
            .create(dir.path(), &skill(), &CreateOptions::new())
            .await
            .unwrap();

        let changes = ArtifactChanges::new().set("description", "B");
        let updated = handler
            .update(dir.path(), "core/example", &changes, &UpdateOptions::new())
            .await
            .unwrap();

        let read = handler
            .read(dir.path(), "core/example", &ReadOptions::new())
            .await
            .unwrap();
        assert_eq!(read.data, updated.data);
        let Artifact::Skill(s) = read.data else {
            panic!("expected skill");
        };
        assert_eq!(s.description.as_deref(), Some("B"));
    }

    #[tokio::test]
    async fn read_without_content() {
        let dir = tempfile::tempdir().unwrap();
        let handler = MarkdownHandler::sub_agents();
        let agent: Artifact = SubAgent::new("reviewer", "Review carefully").into();
        handler.create(dir.path(), &agent, &CreateOptions::new()).await.unwrap();

        let read = handler
            .read(dir.path(), "reviewer", &ReadOptions::metadata_only())
            .await
            .unwrap();
        assert_eq!(read.data.content(), Some(""));
    }

    #[tokio::test]
    async fn delete_removes_and_soft_delete_stashes() {
        let dir = tempfile::tempdir().unwrap();
        let handler = MarkdownHandler::skills();
        handler
            .create(dir.path(), &skill(), &CreateOptions::new())
            .await
            .unwrap();

        handler
            .delete(dir.path(), "core/example", &DeleteOptions::new().soft())
            .await
            .unwrap();

        assert!(handler
            .read(dir.path(), "core/example", &ReadOptions::new())
            .await
            .unwrap_err()
            .is_not_found());
        assert!(!dir.path().join(".claude/skills/core/example").exists());
        assert!(dir.path().join(".claude/.trash/skill/core__example.json").exists());
    }

    #[tokio::test]
    async fn delete_missing_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let err = MarkdownHandler::commands()
            .delete(dir.path(), "nope", &DeleteOptions::new())
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn list_is_sorted_and_tolerates_missing_dir() {
        let dir = tempfile::tempdir().unwrap();
        let handler = MarkdownHandler::skills();
        assert!(handler.list(dir.path()).await.unwrap().data.is_empty());

        for (category, name) in [("web", "b"), ("core", "z"), ("core", "a")] {
            let s: Artifact = Skill::new(category, name, "x").into();
            handler.create(dir.path(), &s, &CreateOptions::new()).await.unwrap();
        }

        let ids: Vec<_> = handler
            .list(dir.path())
            .await
            .unwrap()
            .data
            .iter()
            .map(Artifact::id)
            .collect();
        assert_eq!(ids, vec!["core/a", "core/z", "web/b"]);
    }

    #[tokio::test]
    async fn hand_written_file_without_frontmatter_reads() {
        let dir = tempfile::tempdir().unwrap();
        let rules = dir.path().join(".claude/rules");
        std::fs::create_dir_all(&rules).unwrap();
        std::fs::write(rules.join("plain.md"), "Always run tests.\n").unwrap();

        let read = MarkdownHandler::rules()
            .read(dir.path(), "plain", &ReadOptions::new())
            .await
            .unwrap();
        assert_eq!(read.data, Artifact::from(Rule::new("plain", "Always run tests.\n")));
    }

    #[tokio::test]
    async fn rejects_traversal_ids() {
        let dir = tempfile::tempdir().unwrap();
        let err = MarkdownHandler::rules()
            .read(dir.path(), "../secrets", &ReadOptions::new())
            .await
            .unwrap_err();
        assert!(matches!(err, HandlerError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn wrong_variant_is_invalid_input() {
        let dir = tempfile::tempdir().unwrap();
        let err = MarkdownHandler::rules()
            .create(dir.path(), &skill(), &CreateOptions::new())
            .await
            .unwrap_err();
        assert!(matches!(err, HandlerError::InvalidInput(_)));
    }
}
