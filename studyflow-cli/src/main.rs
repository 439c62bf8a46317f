use anyhow::{anyhow, Context, Result};
use chrono::{NaiveDate, Utc};
use clap::{Parser, Subcommand};
use std::collections::BTreeSet;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use studyflow_core::{
    eligibility, ActorId, Child, CriteriaExpression, ParticipationHistory, Study, StudyId,
    StudyState, Vocabulary,
};
use studyflow_engine::{
    declarations, table, Capability, CapabilityTable, EventBus, InMemoryStudyRepository,
    LoggingNotifier, NoopBuildPipeline, StudyRepository, Trigger, WorkflowEngine,
};

/// Studyflow: study lifecycle and eligibility tooling
#[derive(Parser, Debug)]
#[command(name = "studyflow")]
#[command(about = "Study lifecycle and eligibility tooling", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Parse a criteria expression and print its syntax tree
    CheckCriteria(CheckCriteriaArgs),
    /// Evaluate a child's eligibility for a study
    Eligibility(EligibilityArgs),
    /// Print the transition table, or the legal triggers for one state
    Transitions(TransitionsArgs),
    /// Run a sequence of triggers against a study in an in-memory engine
    Simulate(SimulateArgs),
}

#[derive(Parser, Debug)]
struct CheckCriteriaArgs {
    /// The expression to check, e.g. 'hearing_loss == true or gender == "f"'
    expression: String,

    /// Declare an extra attribute as NAME:KIND (kind is bool, int, text, or
    /// text_list), in addition to the standard vocabulary
    #[arg(long = "declare", value_name = "NAME:KIND")]
    declarations: Vec<String>,
}

#[derive(Parser, Debug)]
struct EligibilityArgs {
    /// Path to a JSON file describing the child
    #[arg(long)]
    child: PathBuf,

    /// Path to a JSON file describing the study
    #[arg(long)]
    study: PathBuf,

    /// Date to evaluate as-of (defaults to today, UTC)
    #[arg(long)]
    date: Option<NaiveDate>,

    /// Study ids the child has completed
    #[arg(long, num_args = 1..)]
    completed: Vec<String>,
}

#[derive(Parser, Debug)]
struct TransitionsArgs {
    /// Only show triggers legal from this state
    #[arg(long)]
    state: Option<StudyState>,
}

#[derive(Parser, Debug)]
struct SimulateArgs {
    /// Path to a JSON file describing the study (defaults to a fresh draft)
    #[arg(long)]
    study: Option<PathBuf>,

    /// Actor name to act as (granted every capability)
    #[arg(long, default_value = "operator")]
    actor: String,

    /// Declarations to attach to every submit in the sequence
    #[arg(long, num_args = 1..)]
    declare: Vec<String>,

    /// The triggers to apply, in order
    #[arg(required = true)]
    triggers: Vec<Trigger>,
}

fn read_json<T: serde::de::DeserializeOwned>(path: &PathBuf, what: &str) -> Result<T> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {} file {}", what, path.display()))?;
    serde_json::from_str(&text)
        .with_context(|| format!("Failed to parse {} file {}", what, path.display()))
}

/// Point at the offending character the way compilers do.
fn caret_diagnostic(source: &str, offset: usize) -> String {
    format!("{}\n{}^", source, " ".repeat(offset))
}

fn build_vocabulary(declarations: &[String]) -> Result<Vocabulary> {
    let mut vocabulary = Vocabulary::standard();
    for declaration in declarations {
        let (name, kind) = declaration
            .split_once(':')
            .with_context(|| format!("Expected NAME:KIND, got {declaration:?}"))?;
        let kind = match kind {
            "bool" => studyflow_core::AttributeKind::Bool,
            "int" => studyflow_core::AttributeKind::Int,
            "text" => studyflow_core::AttributeKind::Text,
            "text_list" => studyflow_core::AttributeKind::TextList,
            other => return Err(anyhow!("Unknown attribute kind {other:?}")),
        };
        vocabulary.declare(name, kind);
    }
    Ok(vocabulary)
}

fn run_check_criteria(args: CheckCriteriaArgs) -> Result<()> {
    let vocabulary = build_vocabulary(&args.declarations)?;

    match CriteriaExpression::parse(&args.expression, &vocabulary) {
        Ok(expression) => {
            match expression.root() {
                Some(root) => println!("{}", serde_json::to_string_pretty(root)?),
                None => println!("(empty expression: always true)"),
            }
            Ok(())
        }
        Err(err) => {
            eprintln!("{}", caret_diagnostic(&args.expression, err.offset()));
            Err(anyhow!("{err}"))
        }
    }
}

fn run_eligibility(args: EligibilityArgs) -> Result<()> {
    let child: Child = read_json(&args.child, "child")?;
    let study: Study = read_json(&args.study, "study")?;
    let today = args.date.unwrap_or_else(|| Utc::now().date_naive());

    let mut participation = ParticipationHistory::new();
    for completed in &args.completed {
        participation.record(child.id.clone(), StudyId::from(completed.as_str()));
    }

    let verdict = eligibility::evaluate(
        &child,
        &study,
        &participation,
        today,
        &Vocabulary::standard(),
    )
    .map_err(|err| {
        eprintln!("{}", caret_diagnostic(&study.criteria_expression, err.offset()));
        anyhow!("Study {} has a malformed criteria expression: {err}", study.id)
    })?;

    println!("{}", serde_json::to_string_pretty(&verdict)?);
    Ok(())
}

fn run_transitions(args: TransitionsArgs) -> Result<()> {
    match args.state {
        Some(state) => {
            for trigger in table::legal_triggers(state) {
                println!("{trigger}");
            }
        }
        None => {
            for edge in table::TRANSITION_TABLE {
                println!(
                    "{:<11} --{}--> {}",
                    edge.from.to_string(),
                    edge.trigger,
                    edge.to
                );
            }
        }
    }
    Ok(())
}

async fn run_simulate(args: SimulateArgs) -> Result<()> {
    let study = match &args.study {
        Some(path) => read_json::<Study>(path, "study")?,
        None => Study::new("draft", "Simulated study"),
    };
    let study_id = study.id.clone();

    let repository = Arc::new(InMemoryStudyRepository::new());
    repository.insert(study).await;

    let mut capabilities = CapabilityTable::new();
    for capability in [
        Capability::SubmitStudy,
        Capability::ReviewStudy,
        Capability::ManageStudy,
    ] {
        capabilities.grant(args.actor.as_str(), capability);
    }

    let (bus, handle) = EventBus::spawn(Arc::new(LoggingNotifier), Arc::new(NoopBuildPipeline));
    let engine = WorkflowEngine::new(repository.clone(), Arc::new(capabilities), bus);

    let actor = ActorId::from(args.actor.as_str());
    for trigger in args.triggers {
        let supplied: BTreeSet<String> = if declarations::schema(trigger).is_empty() {
            BTreeSet::new()
        } else {
            args.declare.iter().cloned().collect()
        };
        let event = engine
            .request_transition(&study_id, trigger, &actor, None, &supplied)
            .await
            .with_context(|| format!("Trigger {trigger} failed"))?;
        println!("{} -> {}", event.from_state, event.to_state);
    }

    let record = repository
        .get(&study_id)
        .await
        .context("Study vanished from the repository")?;
    println!("final state: {}", record.study.state);
    println!("legal triggers: {:?}", engine.legal_triggers(&study_id).await?);

    drop(engine);
    handle.await.context("Event dispatcher panicked")?;
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::CheckCriteria(args) => run_check_criteria(args),
        Commands::Eligibility(args) => run_eligibility(args),
        Commands::Transitions(args) => run_transitions(args),
        Commands::Simulate(args) => run_simulate(args).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_caret_points_at_the_offset() {
        let diagnostic = caret_diagnostic("gender == 3", 10);
        let lines: Vec<_> = diagnostic.lines().collect();
        assert_eq!(lines[0], "gender == 3");
        assert_eq!(lines[1], "          ^");
    }

    #[test]
    fn test_help_example_expression_parses() {
        // The example shown in the check-criteria help text must stay valid.
        let result = CriteriaExpression::parse(
            r#"hearing_loss == true or gender == "f""#,
            &Vocabulary::standard(),
        );
        assert!(result.is_ok());
    }

    #[test]
    fn test_build_vocabulary_accepts_declarations() {
        let vocabulary = build_vocabulary(&["siblings:int".to_string()]).unwrap();
        assert!(vocabulary.kind_of("siblings").is_some());
        assert!(build_vocabulary(&["siblings".to_string()]).is_err());
        assert!(build_vocabulary(&["siblings:float".to_string()]).is_err());
    }
}
