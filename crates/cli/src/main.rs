use anyhow::{bail, Context};
use clap::{Args, Parser, Subcommand};
use form_schema::Concept;
use formbuilder_core::constants::CONFIG_ENV_VAR;
use formbuilder_core::{
    resolve_editor_config, ConceptCatalogue, ConceptSearch, Creating, EditorConfig, Editing,
    Notification, NotificationKind, Notifier, OptionalProperty, QuestionDraft, SchemaDocument,
    SchemaStore,
};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "formbuilder")]
#[command(about = "Edit the questions of a clinical form schema")]
struct Cli {
    /// YAML file with the allowed question types and renderings
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the sections and questions of a schema
    Show {
        /// Schema JSON file
        schema: PathBuf,
    },
    /// Append a new question to a section
    AddQuestion {
        /// Schema JSON file
        schema: PathBuf,
        /// Section index
        #[arg(long)]
        section: usize,
        #[command(flatten)]
        fields: QuestionFields,
    },
    /// Edit an existing question
    EditQuestion {
        /// Schema JSON file
        schema: PathBuf,
        /// Section index
        #[arg(long)]
        section: usize,
        /// Question index within the section
        #[arg(long)]
        index: usize,
        #[command(flatten)]
        fields: QuestionFields,
    },
    /// Delete a question; later questions in the section move up
    DeleteQuestion {
        /// Schema JSON file
        schema: PathBuf,
        /// Section index
        #[arg(long)]
        section: usize,
        /// Question index within the section
        #[arg(long)]
        index: usize,
    },
    /// Search a concept catalogue by display name
    SearchConcepts {
        /// JSON file holding an array of concepts
        #[arg(long)]
        catalogue: PathBuf,
        /// Search term
        term: String,
    },
}

/// Draft edits, applied in a fixed order: removals, selections, text fields, properties,
/// then concept binding.
#[derive(Args, Debug, Default)]
struct QuestionFields {
    #[arg(long)]
    label: Option<String>,
    #[arg(long = "type")]
    question_type: Option<String>,
    #[arg(long)]
    id: Option<String>,
    #[arg(long)]
    rendering: Option<String>,
    #[arg(long)]
    min: Option<String>,
    #[arg(long)]
    max: Option<String>,
    #[arg(long)]
    rows: Option<String>,
    /// Week list as JSON, e.g. "[2, 4, 6]"
    #[arg(long)]
    week_list: Option<String>,
    /// Answers as JSON
    #[arg(long)]
    answers: Option<String>,
    /// Concept mappings as JSON
    #[arg(long)]
    concept_mappings: Option<String>,
    #[arg(long)]
    order_type: Option<String>,
    #[arg(long)]
    order_setting_uuid: Option<String>,
    /// Selectable orders as JSON
    #[arg(long)]
    selectable_orders: Option<String>,
    /// Concept UUID or display name to bind; looked up in --catalogue
    #[arg(long, requires = "catalogue")]
    concept: Option<String>,
    /// JSON file holding an array of concepts
    #[arg(long)]
    catalogue: Option<PathBuf>,
    /// Drop the bound concept with its answers and mappings
    #[arg(long)]
    unbind_concept: bool,
    /// Optional property to switch off (repeatable)
    #[arg(long)]
    remove: Vec<OptionalProperty>,
}

/// Prints notifications: successes to stdout, everything else to stderr.
struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
    fn notify(&self, notification: Notification) {
        match notification.kind {
            NotificationKind::Success => {
                println!("{} {}", notification.title, notification.message)
            }
            NotificationKind::Error | NotificationKind::Warning => {
                eprintln!("{}: {}", notification.title, notification.message)
            }
        }
    }
}

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("formbuilder=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let config_path = cli
        .config
        .or_else(|| std::env::var_os(CONFIG_ENV_VAR).map(PathBuf::from));
    let config = Arc::new(resolve_editor_config(config_path)?);

    match cli.command {
        Some(Commands::Show { schema }) => {
            let document = load_document(&schema)?;
            print!("{}", describe(&document));
        }
        Some(Commands::AddQuestion {
            schema,
            section,
            fields,
        }) => {
            let index = add_question(&schema, section, &fields, config, &ConsoleNotifier)?;
            tracing::info!(section, index, "added question to {}", schema.display());
        }
        Some(Commands::EditQuestion {
            schema,
            section,
            index,
            fields,
        }) => {
            edit_question(&schema, section, index, &fields, config, &ConsoleNotifier)?;
            tracing::info!(section, index, "updated question in {}", schema.display());
        }
        Some(Commands::DeleteQuestion {
            schema,
            section,
            index,
        }) => {
            let label = delete_question(&schema, section, index)?;
            println!("Deleted question {index} ({label}) from section {section}");
        }
        Some(Commands::SearchConcepts { catalogue, term }) => {
            let catalogue = load_catalogue(&catalogue)?;
            for concept in catalogue.search(&term)? {
                println!("{}  {}", concept.uuid, concept.display);
            }
        }
        None => {
            println!("Use 'formbuilder --help' for commands");
        }
    }

    Ok(())
}

// ============================================================================
// Commands
// ============================================================================

fn add_question(
    schema: &Path,
    section: usize,
    fields: &QuestionFields,
    config: Arc<EditorConfig>,
    notifier: &dyn Notifier,
) -> anyhow::Result<usize> {
    let mut store = SchemaStore::from_document(load_document(schema)?);
    let mut draft = QuestionDraft::<Creating>::new(config, &store.current(), section)?;
    apply_fields(&mut draft, fields, notifier)?;

    let (document, index) = draft.submit(&mut store, notifier)?;
    save_document(schema, &document)?;
    Ok(index)
}

fn edit_question(
    schema: &Path,
    section: usize,
    index: usize,
    fields: &QuestionFields,
    config: Arc<EditorConfig>,
    notifier: &dyn Notifier,
) -> anyhow::Result<()> {
    let mut store = SchemaStore::from_document(load_document(schema)?);
    let mut draft = QuestionDraft::<Editing>::open(config, &store.current(), section, index)?;
    apply_fields(&mut draft, fields, notifier)?;

    let document = draft
        .submit(&mut store, notifier)
        .map_err(|rejected| rejected.error)?;
    save_document(schema, &document)
}

fn delete_question(schema: &Path, section: usize, index: usize) -> anyhow::Result<String> {
    let mut store = SchemaStore::from_document(load_document(schema)?);
    let (document, removed) = store.delete_question(section, index)?;
    save_document(schema, &document)?;
    Ok(removed.label)
}

fn apply_fields<M>(
    draft: &mut QuestionDraft<M>,
    fields: &QuestionFields,
    notifier: &dyn Notifier,
) -> anyhow::Result<()> {
    for property in &fields.remove {
        draft.deactivate(*property);
    }
    if fields.unbind_concept {
        draft.remove_concept();
    }

    if let Some(question_type) = &fields.question_type {
        draft.select_type(question_type)?;
    }
    if let Some(rendering) = &fields.rendering {
        draft.select_rendering(rendering)?;
    }
    if let Some(label) = &fields.label {
        draft.set_label(label.as_str());
    }
    if let Some(id) = &fields.id {
        draft.set_id(id.as_str());
    }
    if let Some(min) = &fields.min {
        draft.set_min(min.as_str());
    }
    if let Some(max) = &fields.max {
        draft.set_max(max.as_str());
    }
    if let Some(rows) = &fields.rows {
        draft.set_rows(rows.as_str());
    }
    if let Some(week_list) = &fields.week_list {
        draft.set_week_list(week_list.as_str());
    }

    let property_texts = [
        (OptionalProperty::Answers, &fields.answers),
        (OptionalProperty::ConceptMappings, &fields.concept_mappings),
        (OptionalProperty::OrderType, &fields.order_type),
        (OptionalProperty::OrderSettingUuid, &fields.order_setting_uuid),
        (OptionalProperty::SelectableOrders, &fields.selectable_orders),
    ];
    for (property, text) in property_texts {
        if let Some(text) = text {
            if !draft.properties().is_active(property) {
                draft.activate(property, notifier);
            }
            draft.set_property_text(property, text)?;
        }
    }

    if let (Some(wanted), Some(catalogue)) = (&fields.concept, &fields.catalogue) {
        let catalogue = load_catalogue(catalogue)?;
        let concept = match catalogue.get(wanted) {
            Some(concept) => concept.clone(),
            None => {
                draft.set_search_term(wanted.as_str());
                draft.refresh_suggestions(&catalogue);
                pick_suggestion(draft.suggestions(), wanted)?.clone()
            }
        };
        let binding = draft.select_concept(&concept)?;
        for malformed in &binding.malformed {
            eprintln!("Skipped {malformed}");
        }
    }

    Ok(())
}

// ============================================================================
// Helpers
// ============================================================================

fn load_document(path: &Path) -> anyhow::Result<SchemaDocument> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read schema {}", path.display()))?;
    SchemaDocument::from_json(&text)
        .with_context(|| format!("failed to parse schema {}", path.display()))
}

fn save_document(path: &Path, document: &SchemaDocument) -> anyhow::Result<()> {
    let mut text = document.to_json()?;
    text.push('\n');
    fs::write(path, text).with_context(|| format!("failed to write schema {}", path.display()))
}

fn load_catalogue(path: &Path) -> anyhow::Result<ConceptCatalogue> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read concept catalogue {}", path.display()))?;
    Ok(ConceptCatalogue::from_json(&text)?)
}

/// Pick the suggestion named by `wanted`: an exact display match wins, otherwise the
/// suggestions must be unambiguous.
fn pick_suggestion<'a>(suggestions: &'a [Concept], wanted: &str) -> anyhow::Result<&'a Concept> {
    if let Some(exact) = suggestions
        .iter()
        .find(|c| c.display.eq_ignore_ascii_case(wanted.trim()))
    {
        return Ok(exact);
    }

    match suggestions {
        [] => bail!("no concept matches {wanted:?}"),
        [only] => Ok(only),
        many => {
            let names: Vec<&str> = many.iter().map(|c| c.display.as_str()).collect();
            bail!("{} concepts match {wanted:?}: {}", many.len(), names.join(", "))
        }
    }
}

fn describe(document: &SchemaDocument) -> String {
    let schema = document.schema();
    let mut out = format!("{} ({} questions)\n", schema.name, schema.question_count());
    for (s, section) in schema.sections.iter().enumerate() {
        out.push_str(&format!("[{s}] {}\n", section.label));
        for (i, question) in section.questions.iter().enumerate() {
            out.push_str(&format!(
                "  [{i}] {} ({}, {}) id={}\n",
                question.label,
                question.question_type,
                question.question_options.rendering,
                question.id
            ));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use formbuilder_core::EditorError;
    use serde_json::{json, Value};
    use std::cell::RefCell;
    use tempfile::TempDir;

    const SCHEMA: &str = r#"{
  "name": "Triage",
  "sections": [
    {
      "label": "Vitals",
      "isExpanded": "true",
      "questions": [
        { "label": "Q0", "type": "obs", "id": "q0", "questionOptions": { "rendering": "text" } },
        { "label": "Q1", "type": "obs", "id": "q1", "questionOptions": { "rendering": "number", "min": 0, "max": 10 } }
      ]
    }
  ]
}"#;

    const CATALOGUE: &str = r#"[
  {
    "uuid": "1643AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA",
    "display": "Malaria test",
    "answers": [{ "uuid": "703AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA", "display": "Positive" }],
    "mappings": [{ "display": "ICD10: A00" }]
  },
  { "uuid": "5089AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA", "display": "Weight (kg)" }
]"#;

    #[derive(Default)]
    struct Recorder(RefCell<Vec<Notification>>);

    impl Notifier for Recorder {
        fn notify(&self, notification: Notification) {
            self.0.borrow_mut().push(notification);
        }
    }

    fn write_fixture(dir: &TempDir, name: &str, contents: &str) -> PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, contents).expect("write fixture");
        path
    }

    fn read_json(path: &Path) -> Value {
        serde_json::from_str(&fs::read_to_string(path).expect("read")).expect("json")
    }

    fn config() -> Arc<EditorConfig> {
        Arc::new(EditorConfig::default())
    }

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_edit_flags() {
        let cli = Cli::try_parse_from([
            "formbuilder",
            "edit-question",
            "form.json",
            "--section",
            "0",
            "--index",
            "1",
            "--type",
            "obs",
            "--remove",
            "answers",
            "--remove",
            "orderType",
        ])
        .expect("valid arguments");

        let Some(Commands::EditQuestion { index, fields, .. }) = cli.command else {
            panic!("expected edit-question");
        };
        assert_eq!(index, 1);
        assert_eq!(fields.question_type.as_deref(), Some("obs"));
        assert_eq!(
            fields.remove,
            [OptionalProperty::Answers, OptionalProperty::OrderType]
        );
    }

    #[test]
    fn rejects_unknown_property_names() {
        let result = Cli::try_parse_from([
            "formbuilder",
            "add-question",
            "form.json",
            "--section",
            "0",
            "--remove",
            "weekList",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn concept_requires_catalogue() {
        let result = Cli::try_parse_from([
            "formbuilder",
            "add-question",
            "form.json",
            "--section",
            "0",
            "--concept",
            "Weight",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn add_question_binds_concept_and_rewrites_file() {
        let dir = TempDir::new().expect("temp dir");
        let schema = write_fixture(&dir, "form.json", SCHEMA);
        let catalogue = write_fixture(&dir, "concepts.json", CATALOGUE);
        let notifier = Recorder::default();

        let fields = QuestionFields {
            label: Some("Malaria".into()),
            question_type: Some("obs".into()),
            id: Some("malaria".into()),
            rendering: Some("select".into()),
            concept: Some("malaria".into()),
            catalogue: Some(catalogue),
            ..QuestionFields::default()
        };
        let index = add_question(&schema, 0, &fields, config(), &notifier).expect("add");
        assert_eq!(index, 2);

        let written = read_json(&schema);
        assert_eq!(
            written["sections"][0]["questions"][2]["questionOptions"],
            json!({
                "rendering": "select",
                "concept": "1643AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA",
                "answers": [{ "label": "Positive", "concept": "703AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA" }],
                "conceptMappings": [{ "type": "ICD10", "value": "A00" }]
            })
        );
        assert_eq!(notifier.0.borrow().len(), 1);
        assert_eq!(notifier.0.borrow()[0].message, "Question Created");
    }

    #[test]
    fn edit_question_failure_keeps_file() {
        let dir = TempDir::new().expect("temp dir");
        let schema = write_fixture(&dir, "form.json", SCHEMA);
        let notifier = Recorder::default();

        let fields = QuestionFields {
            selectable_orders: Some("[{".into()),
            ..QuestionFields::default()
        };
        let err = edit_question(&schema, 0, 0, &fields, config(), &notifier)
            .expect_err("invalid JSON");

        assert!(matches!(
            err.downcast_ref::<EditorError>(),
            Some(EditorError::Parse(_))
        ));
        assert_eq!(fs::read_to_string(&schema).unwrap(), SCHEMA);
        assert_eq!(notifier.0.borrow()[0].kind, NotificationKind::Error);
    }

    #[test]
    fn edit_question_switches_rendering() {
        let dir = TempDir::new().expect("temp dir");
        let schema = write_fixture(&dir, "form.json", SCHEMA);

        let fields = QuestionFields {
            rendering: Some("textarea".into()),
            rows: Some("4".into()),
            ..QuestionFields::default()
        };
        edit_question(&schema, 0, 1, &fields, config(), &Recorder::default()).expect("edit");

        let written = read_json(&schema);
        assert_eq!(
            written["sections"][0]["questions"][1]["questionOptions"],
            json!({ "rendering": "textarea", "rows": "4" })
        );
    }

    #[test]
    fn delete_question_shifts_and_describes() {
        let dir = TempDir::new().expect("temp dir");
        let schema = write_fixture(&dir, "form.json", SCHEMA);

        let label = delete_question(&schema, 0, 0).expect("delete");
        assert_eq!(label, "Q0");

        let document = load_document(&schema).expect("reload");
        assert_eq!(
            describe(&document),
            "Triage (1 questions)\n[0] Vitals\n  [0] Q1 (obs, number) id=q1\n"
        );
    }

    #[test]
    fn ambiguous_concept_names_are_refused() {
        let suggestions = vec![
            Concept::new("a", "Weight (kg)"),
            Concept::new("b", "Weight (lb)"),
        ];
        let err = pick_suggestion(&suggestions, "weight").expect_err("two matches");
        assert!(err.to_string().contains("2 concepts match"));

        let picked = pick_suggestion(&suggestions, "weight (lb)").expect("exact match");
        assert_eq!(picked.uuid, "b");
    }
}
