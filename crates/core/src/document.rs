//! Versioned schema document.
//!
//! A [`SchemaDocument`] is an immutable snapshot of the form being edited. Every mutation
//! (replace, append, delete) builds a new snapshot from the current one; [`SchemaStore`]
//! publishes it as the next version and hands the shared `Arc` to every subscribed
//! [`SchemaConsumer`]. Readers never observe a half-applied edit.
//!
//! ## Positional identity
//!
//! Questions are addressed by `(section, index)`. Deleting a question shifts every later
//! question down by one, so each section keeps a log of the indices deleted from it. A
//! [`QuestionRef`] records its *layout epoch*, the length of that log when it was resolved.
//! The ref goes stale once a later delete lands at or below its index; writing through it
//! then fails with [`EditorError::StaleQuestionRef`] instead of overwriting whichever
//! question now sits at that index. Deletes above the ref leave it valid.

use crate::{EditorError, EditorResult};
use chrono::{DateTime, Utc};
use form_schema::{Question, Schema, Section};
use std::fmt;
use std::sync::Arc;

/// A question position resolved against a specific section layout.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct QuestionRef {
    section: usize,
    index: usize,
    layout_epoch: u64,
}

impl QuestionRef {
    pub fn section(&self) -> usize {
        self.section
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn layout_epoch(&self) -> u64 {
        self.layout_epoch
    }
}

impl fmt::Display for QuestionRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "section {} question {}", self.section, self.index)
    }
}

/// Immutable snapshot of a schema.
#[derive(Clone, Debug, PartialEq)]
pub struct SchemaDocument {
    schema: Schema,
    version: u64,
    published_at: DateTime<Utc>,
    section_deletes: Vec<Vec<usize>>,
}

impl SchemaDocument {
    /// Wrap a schema as version 0.
    pub fn new(schema: Schema) -> Self {
        let section_deletes = vec![Vec::new(); schema.sections.len()];
        Self {
            schema,
            version: 0,
            published_at: Utc::now(),
            section_deletes,
        }
    }

    /// Parse schema JSON into a version 0 document.
    pub fn from_json(json_text: &str) -> EditorResult<Self> {
        Ok(Self::new(Schema::parse(json_text)?))
    }

    /// Render the schema as pretty-printed JSON.
    pub fn to_json(&self) -> EditorResult<String> {
        Ok(self.schema.render()?)
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn published_at(&self) -> DateTime<Utc> {
        self.published_at
    }

    pub fn section(&self, section: usize) -> EditorResult<&Section> {
        self.schema
            .sections
            .get(section)
            .ok_or(EditorError::SectionNotFound { section })
    }

    pub fn question(&self, section: usize, index: usize) -> EditorResult<&Question> {
        self.section(section)?
            .questions
            .get(index)
            .ok_or(EditorError::QuestionNotFound { section, index })
    }

    /// Resolve `(section, index)` against the current layout.
    pub fn question_ref(&self, section: usize, index: usize) -> EditorResult<QuestionRef> {
        self.question(section, index)?;
        Ok(QuestionRef {
            section,
            index,
            layout_epoch: self.layout_epoch(section),
        })
    }

    /// Look up the question behind `target`, rejecting stale refs.
    pub fn resolve(&self, target: &QuestionRef) -> EditorResult<&Question> {
        self.check_current(target)?;
        self.question(target.section, target.index)
    }

    /// A copy of this document with the question at `target` replaced.
    pub fn replace_question(&self, target: &QuestionRef, question: Question) -> EditorResult<Self> {
        self.resolve(target)?;

        let mut schema = self.schema.clone();
        schema.sections[target.section].questions[target.index] = question;
        Ok(self.successor(schema, self.section_deletes.clone()))
    }

    /// A copy of this document with `question` appended to `section`, plus its new index.
    pub fn append_question(&self, section: usize, question: Question) -> EditorResult<(Self, usize)> {
        self.section(section)?;

        let mut schema = self.schema.clone();
        let questions = &mut schema.sections[section].questions;
        questions.push(question);
        let index = questions.len() - 1;
        Ok((self.successor(schema, self.section_deletes.clone()), index))
    }

    /// A copy of this document without the question at `(section, index)`, plus the removed
    /// question. Later questions in the section shift down and the delete is logged so refs
    /// at or past `index` go stale.
    pub fn delete_question(&self, section: usize, index: usize) -> EditorResult<(Self, Question)> {
        self.question(section, index)?;

        let mut schema = self.schema.clone();
        let removed = schema.sections[section].questions.remove(index);
        let mut section_deletes = self.section_deletes.clone();
        section_deletes[section].push(index);
        Ok((self.successor(schema, section_deletes), removed))
    }

    fn deletes(&self, section: usize) -> &[usize] {
        self.section_deletes
            .get(section)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    fn layout_epoch(&self, section: usize) -> u64 {
        self.deletes(section).len() as u64
    }

    fn check_current(&self, target: &QuestionRef) -> EditorResult<()> {
        self.section(target.section)?;
        let since = usize::try_from(target.layout_epoch).unwrap_or(usize::MAX);
        // Deletes above the ref leave its index on the same question.
        let moved = match self.deletes(target.section).get(since..) {
            Some(later) => later.iter().any(|&deleted| deleted <= target.index),
            None => true,
        };
        if moved {
            return Err(EditorError::StaleQuestionRef {
                section: target.section,
                index: target.index,
            });
        }
        Ok(())
    }

    /// Unpublished successor; [`SchemaStore::publish`] stamps the version and time.
    fn successor(&self, schema: Schema, section_deletes: Vec<Vec<usize>>) -> Self {
        Self {
            schema,
            version: self.version,
            published_at: self.published_at,
            section_deletes,
        }
    }
}

/// Receives every published document version.
pub trait SchemaConsumer {
    fn on_publish(&self, document: &Arc<SchemaDocument>);
}

impl<F> SchemaConsumer for F
where
    F: Fn(&Arc<SchemaDocument>),
{
    fn on_publish(&self, document: &Arc<SchemaDocument>) {
        self(document)
    }
}

/// Holds the latest published document and fans out new versions.
pub struct SchemaStore {
    current: Arc<SchemaDocument>,
    consumers: Vec<Box<dyn SchemaConsumer>>,
}

impl fmt::Debug for SchemaStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SchemaStore")
            .field("version", &self.current.version)
            .field("consumers", &self.consumers.len())
            .finish()
    }
}

impl SchemaStore {
    pub fn new(schema: Schema) -> Self {
        Self::from_document(SchemaDocument::new(schema))
    }

    pub fn from_document(document: SchemaDocument) -> Self {
        Self {
            current: Arc::new(document),
            consumers: Vec::new(),
        }
    }

    /// The latest published version.
    pub fn current(&self) -> Arc<SchemaDocument> {
        Arc::clone(&self.current)
    }

    pub fn subscribe(&mut self, consumer: Box<dyn SchemaConsumer>) {
        self.consumers.push(consumer);
    }

    /// Install `next` as the latest version and notify consumers.
    pub fn publish(&mut self, mut next: SchemaDocument) -> Arc<SchemaDocument> {
        next.version = self.current.version + 1;
        next.published_at = Utc::now();

        let next = Arc::new(next);
        self.current = Arc::clone(&next);
        tracing::info!(version = next.version, "published schema document");

        for consumer in &self.consumers {
            consumer.on_publish(&next);
        }
        next
    }

    pub fn replace_question(
        &mut self,
        target: &QuestionRef,
        question: Question,
    ) -> EditorResult<Arc<SchemaDocument>> {
        let next = self.current.replace_question(target, question)?;
        Ok(self.publish(next))
    }

    pub fn append_question(
        &mut self,
        section: usize,
        question: Question,
    ) -> EditorResult<(Arc<SchemaDocument>, usize)> {
        let (next, index) = self.current.append_question(section, question)?;
        Ok((self.publish(next), index))
    }

    pub fn delete_question(
        &mut self,
        section: usize,
        index: usize,
    ) -> EditorResult<(Arc<SchemaDocument>, Question)> {
        let (next, removed) = self.current.delete_question(section, index)?;
        Ok((self.publish(next), removed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn schema_with_questions(count: usize) -> Schema {
        let mut section = Section::new("Vitals");
        for i in 0..count {
            section
                .questions
                .push(Question::new(format!("Q{i}"), "obs", format!("q{i}"), "text"));
        }
        let mut schema = Schema::new("Triage");
        schema.sections.push(section);
        schema.sections.push(Section::new("Plan"));
        schema
    }

    fn labels(document: &SchemaDocument, section: usize) -> Vec<String> {
        document
            .section(section)
            .unwrap()
            .questions
            .iter()
            .map(|q| q.label.clone())
            .collect()
    }

    #[test]
    fn replace_publishes_new_version_and_leaves_old_snapshot() {
        let mut store = SchemaStore::new(schema_with_questions(2));
        let before = store.current();
        let target = before.question_ref(0, 1).unwrap();

        let after = store
            .replace_question(&target, Question::new("Pulse", "obs", "pulse", "number"))
            .expect("replace should succeed");

        assert_eq!(after.version(), 1);
        assert_eq!(labels(&after, 0), ["Q0", "Pulse"]);
        assert_eq!(labels(&before, 0), ["Q0", "Q1"]);
        assert_eq!(before.version(), 0);
    }

    #[test]
    fn append_returns_new_index() {
        let mut store = SchemaStore::new(schema_with_questions(1));
        let (document, index) = store
            .append_question(1, Question::new("Next visit", "obs", "next", "date"))
            .expect("append should succeed");

        assert_eq!(index, 0);
        assert_eq!(labels(&document, 1), ["Next visit"]);
    }

    #[test]
    fn delete_shifts_later_questions_down() {
        let mut store = SchemaStore::new(schema_with_questions(4));
        let (document, removed) = store.delete_question(0, 2).expect("delete");

        assert_eq!(removed.label, "Q2");
        assert_eq!(labels(&document, 0), ["Q0", "Q1", "Q3"]);
        assert_eq!(document.question(0, 2).unwrap().label, "Q3");
    }

    #[test]
    fn refs_resolved_before_a_delete_are_stale() {
        let mut store = SchemaStore::new(schema_with_questions(4));
        let stale = store.current().question_ref(0, 3).unwrap();
        let earlier = store.current().question_ref(0, 0).unwrap();

        store.delete_question(0, 2).expect("delete");

        let err = store
            .replace_question(&stale, Question::new("X", "obs", "x", "text"))
            .expect_err("stale ref must not overwrite");
        assert!(matches!(
            err,
            EditorError::StaleQuestionRef {
                section: 0,
                index: 3
            }
        ));
        assert_eq!(store.current().resolve(&earlier).unwrap().label, "Q0");
        assert_eq!(store.current().version(), 1);

        let fresh = store.current().question_ref(0, 2).unwrap();
        assert_eq!(store.current().resolve(&fresh).unwrap().label, "Q3");
    }

    #[test]
    fn deletes_above_a_ref_leave_it_valid() {
        let mut store = SchemaStore::new(schema_with_questions(5));
        let target = store.current().question_ref(0, 1).unwrap();

        store.delete_question(0, 4).expect("delete");
        store.delete_question(0, 2).expect("delete");
        store
            .replace_question(&target, Question::new("Pulse", "obs", "pulse", "number"))
            .expect("ref below every delete stays valid");
        assert_eq!(labels(&store.current(), 0), ["Q0", "Pulse", "Q3"]);

        store.delete_question(0, 0).expect("delete");
        let err = store
            .current()
            .resolve(&target)
            .expect_err("delete below the ref shifts it");
        assert!(matches!(
            err,
            EditorError::StaleQuestionRef {
                section: 0,
                index: 1
            }
        ));
    }

    #[test]
    fn appends_do_not_invalidate_refs() {
        let mut store = SchemaStore::new(schema_with_questions(1));
        let target = store.current().question_ref(0, 0).unwrap();

        store
            .append_question(0, Question::new("B", "obs", "b", "text"))
            .unwrap();
        store
            .replace_question(&target, Question::new("A", "obs", "a", "text"))
            .expect("ref survives appends");
        assert_eq!(labels(&store.current(), 0), ["A", "B"]);
    }

    #[test]
    fn missing_targets_are_reported() {
        let store = SchemaStore::new(schema_with_questions(1));
        let document = store.current();

        assert!(matches!(
            document.question(5, 0),
            Err(EditorError::SectionNotFound { section: 5 })
        ));
        assert!(matches!(
            document.question_ref(0, 1),
            Err(EditorError::QuestionNotFound {
                section: 0,
                index: 1
            })
        ));
        assert!(matches!(
            document.append_question(2, Question::new("A", "obs", "a", "text")),
            Err(EditorError::SectionNotFound { section: 2 })
        ));
    }

    #[test]
    fn consumers_see_every_published_version() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);

        let mut store = SchemaStore::new(schema_with_questions(2));
        store.subscribe(Box::new(move |doc: &Arc<SchemaDocument>| {
            sink.borrow_mut().push(doc.version())
        }));

        store.delete_question(0, 0).unwrap();
        store
            .append_question(0, Question::new("C", "obs", "c", "text"))
            .unwrap();

        assert_eq!(*seen.borrow(), [1, 2]);
    }

    #[test]
    fn json_round_trip_preserves_schema() {
        let document = SchemaDocument::new(schema_with_questions(2));
        let json = document.to_json().expect("render");
        let reparsed = SchemaDocument::from_json(&json).expect("parse");
        assert_eq!(reparsed.schema(), document.schema());
    }
}
