use std::collections::HashSet;
use std::path::Path;

use serde::Deserialize;

use crate::errors::CatalogError;
use crate::models::{PublicQuestion, Question};

const BUILTIN_CATALOG: &str = include_str!("../../data/questions.json");

const UNVERSIONED: &str = "unversioned";

/// Either `{ "version": .., "questions": [..] }` or a bare question array.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum CatalogFile {
    Versioned {
        version: String,
        questions: Vec<Question>,
    },
    Bare(Vec<Question>),
}

/// Ordered, immutable question list. Validated once at load; the engine
/// relies on every `correct_index` being in range.
#[derive(Debug, Clone)]
pub struct QuestionCatalog {
    version: String,
    questions: Vec<Question>,
}

impl QuestionCatalog {
    pub fn from_questions(
        version: impl Into<String>,
        questions: Vec<Question>,
    ) -> Result<Self, CatalogError> {
        validate(&questions)?;
        Ok(Self {
            version: version.into(),
            questions,
        })
    }

    pub fn from_json_str(raw: &str) -> Result<Self, CatalogError> {
        match serde_json::from_str(raw)? {
            CatalogFile::Versioned { version, questions } => {
                Self::from_questions(version, questions)
            }
            CatalogFile::Bare(questions) => Self::from_questions(UNVERSIONED, questions),
        }
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, CatalogError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| CatalogError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json_str(&raw)
    }

    /// The catalog bundled with the binary.
    pub fn builtin() -> Result<Self, CatalogError> {
        Self::from_json_str(BUILTIN_CATALOG)
    }

    /// Loads `path` when configured, the bundled catalog otherwise.
    pub fn load(path: Option<&str>) -> Result<Self, CatalogError> {
        let catalog = match path {
            Some(path) => Self::from_path(path)?,
            None => Self::builtin()?,
        };
        tracing::info!(
            "Question catalog loaded: version={}, questions={}",
            catalog.version,
            catalog.len()
        );
        Ok(catalog)
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn get(&self, index: usize) -> Option<&Question> {
        self.questions.get(index)
    }

    pub fn len(&self) -> usize {
        self.questions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    pub fn last_index(&self) -> usize {
        self.questions.len().saturating_sub(1)
    }

    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    pub fn public_questions(&self) -> Vec<PublicQuestion> {
        self.questions.iter().map(PublicQuestion::from).collect()
    }
}

fn validate(questions: &[Question]) -> Result<(), CatalogError> {
    if questions.is_empty() {
        return Err(CatalogError::Empty);
    }

    let mut seen = HashSet::with_capacity(questions.len());
    for question in questions {
        if !seen.insert(question.id) {
            return Err(CatalogError::DuplicateId(question.id));
        }
        if question.prompt.trim().is_empty() {
            return Err(CatalogError::EmptyPrompt { id: question.id });
        }
        if question.options.len() < 2 {
            return Err(CatalogError::TooFewOptions {
                id: question.id,
                count: question.options.len(),
            });
        }
        if question.correct_index >= question.options.len() {
            return Err(CatalogError::CorrectIndexOutOfRange {
                id: question.id,
                correct_index: question.correct_index,
                options: question.options.len(),
            });
        }
    }

    Ok(())
}
