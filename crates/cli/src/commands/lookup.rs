use adesao_core::form::{FormField, FormSession, PostalCodeStatus, TaxIdStatus};
use adesao_core::masks::{is_complete_postal_code, is_complete_tax_id};

use crate::commands::{
    controller, load_config, runtime, CommandResult, EXIT_INPUT, EXIT_REJECTED, EXIT_UPSTREAM,
};

pub fn lookup_cep(cep: &str) -> CommandResult {
    const COMMAND: &str = "lookup-cep";

    let mut session = FormSession::new();
    if let Err(error) = session.edit(FormField::PostalCode, cep) {
        return CommandResult::failure(COMMAND, "invalid_input", error.to_string(), EXIT_INPUT);
    }
    if !is_complete_postal_code(&session.form().postal_code) {
        return CommandResult::failure(
            COMMAND,
            "invalid_input",
            format!("`{cep}` is not an 8-digit postal code"),
            EXIT_INPUT,
        );
    }

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

    let status = runtime.block_on(controller.lookup_postal_code(&mut session));
    let form = session.form();
    match status {
        PostalCodeStatus::Found => CommandResult::success(
            COMMAND,
            format!(
                "{}: {}, {}, {}/{}",
                form.postal_code, form.street, form.district, form.city, form.state_code
            ),
        ),
        _ => CommandResult::failure(
            COMMAND,
            "not_found",
            session.status().message.clone().unwrap_or_default(),
            EXIT_REJECTED,
        ),
    }
}

pub fn check_cpf(cpf: &str, birth_date: &str) -> CommandResult {
    const COMMAND: &str = "check-cpf";

    let mut session = FormSession::new();
    let edited = session
        .edit(FormField::TaxId, cpf)
        .and_then(|()| session.edit(FormField::BirthDate, birth_date));
    if let Err(error) = edited {
        return CommandResult::failure(COMMAND, "invalid_input", error.to_string(), EXIT_INPUT);
    }
    if !is_complete_tax_id(&session.form().tax_id) {
        return CommandResult::failure(
            COMMAND,
            "invalid_input",
            format!("`{cpf}` is not an 11-digit CPF"),
            EXIT_INPUT,
        );
    }
    if session.form().parsed_birth_date().is_none() {
        return CommandResult::failure(
            COMMAND,
            "invalid_input",
            format!("`{birth_date}` is not a YYYY-MM-DD or DD/MM/YYYY date"),
            EXIT_INPUT,
        );
    }

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

    let status = runtime.block_on(controller.check_tax_id(&mut session));
    let message = session.status().message.clone().unwrap_or_default();
    match status {
        TaxIdStatus::Valid => {
            CommandResult::success(
                COMMAND,
                format!("{} disponível para cadastro", session.form().tax_id),
            )
        }
        TaxIdStatus::Invalid => {
            CommandResult::failure(COMMAND, "invalid_tax_id", message, EXIT_INPUT)
        }
        TaxIdStatus::Exists => {
            let message = if session.is_name_locked() {
                format!("{message} ({})", session.form().full_name)
            } else {
                message
            };
            CommandResult::failure(COMMAND, "tax_id_exists", message, EXIT_REJECTED)
        }
        TaxIdStatus::Idle => CommandResult::failure(
            COMMAND,
            "duplicate_check_unavailable",
            "duplicate check did not answer; see logs for details",
            EXIT_UPSTREAM,
        ),
    }
}
