//! Read-only question bank boundary.
//!
//! The bank is externally owned: the engine only reads questions by category
//! or id. The bundled implementation loads a JSON file into memory at
//! startup.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use futures::future::BoxFuture;
use serde::Deserialize;
use uuid::Uuid;

use crate::dao::models::{Category, QuestionEntity};
use crate::dao::storage::{StorageError, StorageResult};

/// Maximum number of distractor answers a question may carry.
pub const MAX_DISTRACTORS: usize = 3;

/// Read API of the externally owned question bank.
pub trait QuestionBank: Send + Sync {
    /// Every question tagged with `category`.
    fn questions_by_category(
        &self,
        category: Category,
    ) -> BoxFuture<'static, StorageResult<Vec<QuestionEntity>>>;
    /// Fetch a single question by id.
    fn question(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<QuestionEntity>>>;
}

/// JSON shape of the bank file: a flat list of questions.
#[derive(Debug, Deserialize)]
struct BankFile {
    questions: Vec<QuestionEntity>,
}

#[derive(Debug, Default)]
struct Catalog {
    by_id: HashMap<Uuid, QuestionEntity>,
    by_category: HashMap<Category, Vec<Uuid>>,
}

/// Immutable in-memory question bank.
#[derive(Debug, Clone, Default)]
pub struct MemoryQuestionBank {
    catalog: Arc<Catalog>,
}

impl MemoryQuestionBank {
    /// Build a bank from a list of questions, rejecting malformed entries.
    pub fn from_questions(questions: Vec<QuestionEntity>) -> StorageResult<Self> {
        let mut catalog = Catalog::default();

        for question in questions {
            if question.prompt.trim().is_empty() {
                return Err(StorageError::corrupted(format!(
                    "question `{}` has an empty prompt",
                    question.id
                )));
            }
            if question.correct_answer.trim().is_empty() {
                return Err(StorageError::corrupted(format!(
                    "question `{}` has an empty correct answer",
                    question.id
                )));
            }
            if question.distractors.len() > MAX_DISTRACTORS {
                return Err(StorageError::corrupted(format!(
                    "question `{}` carries {} distractors (max {})",
                    question.id,
                    question.distractors.len(),
                    MAX_DISTRACTORS
                )));
            }
            if catalog.by_id.contains_key(&question.id) {
                return Err(StorageError::corrupted(format!(
                    "duplicate question id `{}` in bank",
                    question.id
                )));
            }

            catalog
                .by_category
                .entry(question.category)
                .or_default()
                .push(question.id);
            catalog.by_id.insert(question.id, question);
        }

        Ok(Self {
            catalog: Arc::new(catalog),
        })
    }

    /// Load and validate a bank from a JSON file on disk.
    pub fn load_from_path(path: &Path) -> StorageResult<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|err| StorageError::unavailable(format!("reading {}", path.display()), err))?;
        let file: BankFile = serde_json::from_str(&contents)
            .map_err(|err| StorageError::corrupted(format!("parsing {}: {err}", path.display())))?;
        Self::from_questions(file.questions)
    }

    /// Number of questions in the bank.
    pub fn len(&self) -> usize {
        self.catalog.by_id.len()
    }

    /// Whether the bank holds no questions at all.
    pub fn is_empty(&self) -> bool {
        self.catalog.by_id.is_empty()
    }
}

impl QuestionBank for MemoryQuestionBank {
    fn questions_by_category(
        &self,
        category: Category,
    ) -> BoxFuture<'static, StorageResult<Vec<QuestionEntity>>> {
        let catalog = self.catalog.clone();
        Box::pin(async move {
            let questions = catalog
                .by_category
                .get(&category)
                .map(|ids| {
                    ids.iter()
                        .filter_map(|id| catalog.by_id.get(id).cloned())
                        .collect()
                })
                .unwrap_or_default();
            Ok(questions)
        })
    }

    fn question(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<QuestionEntity>>> {
        let catalog = self.catalog.clone();
        Box::pin(async move { Ok(catalog.by_id.get(&id).cloned()) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn question(category: Category) -> QuestionEntity {
        QuestionEntity {
            id: Uuid::new_v4(),
            category,
            prompt: "What is the capital of France?".into(),
            correct_answer: "Paris".into(),
            distractors: vec!["Lyon".into(), "Marseille".into()],
        }
    }

    #[test]
    fn builds_category_index() {
        let bank = MemoryQuestionBank::from_questions(vec![
            question(Category::Geography),
            question(Category::Geography),
            question(Category::Science),
        ])
        .unwrap();
        assert_eq!(bank.len(), 3);
    }

    #[test]
    fn rejects_too_many_distractors() {
        let mut bad = question(Category::Science);
        bad.distractors = vec!["a".into(), "b".into(), "c".into(), "d".into()];
        assert!(MemoryQuestionBank::from_questions(vec![bad]).is_err());
    }

    #[test]
    fn rejects_duplicate_ids() {
        let first = question(Category::History);
        let mut second = question(Category::History);
        second.id = first.id;
        assert!(MemoryQuestionBank::from_questions(vec![first, second]).is_err());
    }

    #[tokio::test]
    async fn lookups_by_category_and_id() {
        let q = question(Category::Music);
        let bank = MemoryQuestionBank::from_questions(vec![q.clone()]).unwrap();

        let by_category = bank.questions_by_category(Category::Music).await.unwrap();
        assert_eq!(by_category, vec![q.clone()]);
        assert!(
            bank.questions_by_category(Category::Sports)
                .await
                .unwrap()
                .is_empty()
        );
        assert_eq!(bank.question(q.id).await.unwrap(), Some(q));
    }
}
