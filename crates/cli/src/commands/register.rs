use std::fs;
use std::path::Path;

use adesao_core::errors::ApplicationError;
use adesao_core::form::{FormSession, GateRejection, SubmitOutcome};
use adesao_core::ports::{SubmissionError, SubmissionReceipt};
use adesao_core::RegistrationForm;
use tracing::info;

use crate::commands::{
    controller, load_config, runtime, CommandResult, EXIT_INPUT, EXIT_REJECTED, EXIT_UPSTREAM,
};

const COMMAND: &str = "register";

enum Finished {
    Submitted(SubmissionReceipt),
    Rejected(GateRejection),
    Failed(SubmissionError),
}

fn read_form(path: &Path) -> Result<RegistrationForm, ApplicationError> {
    let raw = fs::read_to_string(path).map_err(|error| {
        ApplicationError::Configuration(format!("could not read `{}`: {error}", path.display()))
    })?;
    toml::from_str(&raw).map_err(|error| {
        ApplicationError::Configuration(format!("could not parse `{}`: {error}", path.display()))
    })
}

/// Runs the whole form flow for a TOML-described applicant: duplicate check,
/// gate, submission, then waits for the webhook before returning.
pub fn run(path: &Path) -> CommandResult {
    let form = match read_form(path) {
        Ok(form) => form,
        Err(error) => {
            return CommandResult::failure(COMMAND, "form_file", error.to_string(), EXIT_INPUT);
        }
    };

    let config = match load_config(COMMAND) {
        Ok(config) => config,
        Err(result) => return result,
    };
    let controller = match controller(COMMAND, &config) {
        Ok(controller) => controller,
        Err(result) => return result,
    };
    let runtime = match runtime(COMMAND) {
        Ok(runtime) => runtime,
        Err(result) => return result,
    };

    let mut session = FormSession::from_form(form);
    let finished = runtime.block_on(async {
        controller.check_tax_id(&mut session).await;
        match controller.submit(&mut session).await {
            SubmitOutcome::Submitted { receipt, notification } => {
                notification.settled().await;
                Finished::Submitted(receipt)
            }
            SubmitOutcome::Rejected(rejection) => Finished::Rejected(rejection),
            SubmitOutcome::Failed(error) => Finished::Failed(error),
        }
    });

    let message = session.status().message.clone().unwrap_or_default();
    match finished {
        Finished::Submitted(receipt) => {
            info!(
                event_name = "cli.register.submitted",
                session_id = %session.id(),
                confirmed = receipt.confirmed,
                "registration submitted"
            );
            let dialog = session.success_dialog();
            let next_step = dialog
                .map(|dialog| format!("{}: {}", dialog.call_to_action, dialog.call_to_action_url))
                .unwrap_or_default();
            CommandResult::success(
                COMMAND,
                format!("cadastro enviado (confirmado: {}). {next_step}", receipt.confirmed),
            )
        }
        Finished::Rejected(rejection) => {
            CommandResult::failure(COMMAND, "gate_rejected", rejection.message(), EXIT_REJECTED)
        }
        Finished::Failed(SubmissionError::DuplicateTaxId) => {
            CommandResult::failure(COMMAND, "duplicate_tax_id", message, EXIT_REJECTED)
        }
        Finished::Failed(error) => CommandResult::failure(
            COMMAND,
            "submission_failed",
            format!("{message} ({error})"),
            EXIT_UPSTREAM,
        ),
    }
}
