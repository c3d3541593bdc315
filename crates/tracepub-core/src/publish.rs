//! The run orchestrator: scan the document, reconcile the parsed items,
//! compose the outputs, and flush everything as one batched write.

use thiserror::Error;
use tracepub_common::{Dimension, Item, Location, RefError};

use crate::gateway::{DocumentGateway, GatewayError, WritePlan};
use crate::loader::{LoadError, Loader, ReconcileOutcome};
use crate::output::{self, CELL_MAX_CHARS, Mode};

#[derive(Debug, Error)]
pub enum PublishError {
    #[error(transparent)]
    Ref(#[from] RefError),
    #[error(transparent)]
    Gateway(#[from] GatewayError),
}

impl From<LoadError> for PublishError {
    fn from(err: LoadError) -> Self {
        match err {
            LoadError::Ref(e) => PublishError::Ref(e),
            LoadError::Gateway(e) => PublishError::Gateway(e),
        }
    }
}

/// Where and how a run publishes.
#[derive(Clone, Debug)]
pub struct PublishOptions {
    /// Cell of the first test identifier in the document.
    pub first_id_location: Location,
    /// Cell where the first test's first message value goes.
    pub first_message_location: Location,
    /// Optional OK/NOK column.
    pub result_location: Option<Location>,
    /// Optional assertions column.
    pub asserts_location: Option<Location>,
    pub mode: Mode,
    /// Axis along which successive tests follow each other.
    pub dimension: Dimension,
    /// Also render passed assertions, not only failures.
    pub include_passed_assertions: bool,
    /// Per-cell character cap; clamped to [`CELL_MAX_CHARS`].
    pub max_cell_chars: usize,
}

impl PublishOptions {
    pub fn new(first_id_location: Location, first_message_location: Location) -> Self {
        PublishOptions {
            first_id_location,
            first_message_location,
            result_location: None,
            asserts_location: None,
            mode: Mode::Message,
            dimension: Dimension::Rows,
            include_passed_assertions: false,
            max_cell_chars: CELL_MAX_CHARS,
        }
    }
}

/// What a run did, for the closing log line.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct PublishSummary {
    /// Aggregates that made it into the write plan.
    pub tests_written: usize,
    /// Among those, rows appended in this run.
    pub tests_created: usize,
    pub items_appended: usize,
    pub items_skipped: usize,
}

/// Run end to end: read existing identifiers, reconcile `items` against
/// them, compose the outputs, and issue a single batched write. Aggregates
/// that collected no items are never written, so a re-run over an unchanged
/// document writes nothing.
pub fn publish<G, I>(
    gateway: &G,
    items: I,
    options: &PublishOptions,
) -> Result<PublishSummary, PublishError>
where
    G: DocumentGateway,
    I: IntoIterator<Item = Item>,
{
    let ids_range = options.first_id_location.extend_to_range(options.dimension)?;
    tracing::info!(range = %ids_range, "reading existing test identifiers");
    let ids = gateway.read(&ids_range, options.dimension)?;

    let mut loader = Loader::new(
        gateway,
        options.dimension,
        &options.first_id_location,
        &options.first_message_location,
        options.result_location.as_ref(),
        options.asserts_location.as_ref(),
    )?;
    let mut map = loader.load(&ids)?;

    let mut summary = PublishSummary::default();
    for item in items {
        match loader.reconcile(&mut map, item)? {
            ReconcileOutcome::Appended => summary.items_appended += 1,
            ReconcileOutcome::Created => {
                summary.items_appended += 1;
                summary.tests_created += 1;
            }
            ReconcileOutcome::Skipped => summary.items_skipped += 1,
        }
    }

    let mut plan = WritePlan::default();
    for test in map.iter() {
        // Aggregates without items are stale header rows or tests the
        // input never mentioned; writing them would clobber the sheet.
        if test.items().is_empty() {
            continue;
        }
        tracing::debug!(test = %test.id(), "composing output");
        let locations = test.locations();
        if test.is_new() {
            if let Some(id_location) = &locations.id {
                plan.push(id_location.clone(), vec![test.id().to_string()]);
            }
            if let (Some(name_location), Some(name)) = (&locations.name, test.name()) {
                plan.push(name_location.clone(), vec![name.to_string()]);
            }
        }
        plan.push(
            locations.first_message.clone(),
            output::compose(test, options.mode, options.max_cell_chars),
        );
        if let Some(result_location) = &locations.result {
            plan.push(
                result_location.clone(),
                vec![output::compose_result(test).to_string()],
            );
        }
        if let Some(asserts_location) = &locations.asserts {
            plan.push(
                asserts_location.clone(),
                vec![output::compose_assertions(
                    test,
                    options.include_passed_assertions,
                )],
            );
        }
        summary.tests_written += 1;
    }

    if plan.is_empty() {
        tracing::info!("nothing to write");
        return Ok(summary);
    }

    tracing::info!(entries = plan.len(), "flushing batched write");
    gateway.batch_write(&plan, options.dimension.opposite())?;
    Ok(summary)
}
