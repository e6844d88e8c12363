//! Drives a [`FormSession`] through lookups, the duplicate gate and
//! submission.
//!
//! The controller holds no session state of its own; every handler takes the
//! session by `&mut` so one controller can serve any number of sessions.
//! Failures of best-effort collaborators (address lookup, duplicate check,
//! webhook) are handed to the [`FormObserver`] and never propagate.

use std::sync::Arc;

use tokio::task::JoinHandle;

use crate::domain::address::AddressLookupResult;
use crate::domain::plan::PlanCatalog;
use crate::domain::registration::{ChipType, ShippingMethod};
use crate::form::state::{
    FieldStatus, FormSession, PostalCodeStatus, SubmissionStatus, SuccessDialog, TaxIdStatus,
};
use crate::masks::{is_complete_tax_id, tax_id_checksum_valid, unmask, POSTAL_CODE_DIGITS};
use crate::ports::{
    AddressLookup, DuplicateCheck, FormObserver, NotifyError, RegistrationGateway,
    SubmissionError, SubmissionReceipt, TracingObserver, WebhookNotifier,
};
use crate::submission::{BackendConstants, RegistrationPayload};
use crate::webhook::WebhookSummary;

pub const MSG_SEARCHING_POSTAL_CODE: &str = "Buscando CEP...";
pub const MSG_POSTAL_CODE_NOT_FOUND: &str = "CEP não encontrado! Verifique o número.";
pub const MSG_VALIDATING_TAX_ID: &str = "Validando CPF...";
pub const MSG_INVALID_TAX_ID: &str = "CPF inválido. Verifique o número digitado.";
pub const MSG_TAX_ID_EXISTS: &str =
    "CPF já consta na base de dados! Não é possível prosseguir com este cadastro.";
pub const MSG_GATE_TAX_ID_EXISTS: &str =
    "Atenção: Este CPF já possui cadastro. Entre em contato com o suporte.";
pub const MSG_MISSING_SHIPPING: &str = "Por favor, escolha uma forma de envio.";
pub const MSG_MISSING_PLAN: &str = "Por favor, selecione um benefício (Plano).";
pub const MSG_SUBMITTING: &str = "Enviando dados do cadastro...";
pub const MSG_SUBMIT_DUPLICATE: &str = "CPF já cadastrado. Não é possível realizar o cadastro.";
pub const MSG_SUBMIT_FAILED: &str =
    "Não foi possível completar o cadastro. Verifique sua conexão e tente novamente.";

#[derive(Clone)]
pub struct FormServices {
    pub address_lookup: Arc<dyn AddressLookup>,
    pub duplicate_check: Arc<dyn DuplicateCheck>,
    pub gateway: Arc<dyn RegistrationGateway>,
    pub notifier: Arc<dyn WebhookNotifier>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GateRejection {
    DuplicateTaxId,
    MissingShippingMethod,
    MissingPlan,
}

impl GateRejection {
    pub fn message(&self) -> &'static str {
        match self {
            Self::DuplicateTaxId => MSG_GATE_TAX_ID_EXISTS,
            Self::MissingShippingMethod => MSG_MISSING_SHIPPING,
            Self::MissingPlan => MSG_MISSING_PLAN,
        }
    }

    pub fn effect(&self) -> UiEffect {
        match self {
            Self::DuplicateTaxId => UiEffect::ScrollToTop,
            Self::MissingShippingMethod | Self::MissingPlan => {
                UiEffect::BlockingPrompt(self.message().to_string())
            }
        }
    }
}

/// What the front-end has to do besides re-rendering the status banner.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum UiEffect {
    ScrollToTop,
    BlockingPrompt(String),
    ShowSuccessDialog,
}

/// Background webhook delivery. Dropping the handle detaches the task.
pub struct NotificationHandle {
    task: JoinHandle<()>,
    observer: Arc<dyn FormObserver>,
}

impl std::fmt::Debug for NotificationHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotificationHandle").field("task", &self.task).finish_non_exhaustive()
    }
}

impl NotificationHandle {
    pub async fn settled(self) {
        if let Err(error) = self.task.await {
            self.observer.notification_failed(&NotifyError::Aborted(error.to_string()));
        }
    }
}

#[derive(Debug)]
pub enum SubmitOutcome {
    Rejected(GateRejection),
    Failed(SubmissionError),
    Submitted { receipt: SubmissionReceipt, notification: NotificationHandle },
}

impl SubmitOutcome {
    pub fn effect(&self) -> UiEffect {
        match self {
            Self::Rejected(rejection) => rejection.effect(),
            Self::Failed(_) => UiEffect::ScrollToTop,
            Self::Submitted { .. } => UiEffect::ShowSuccessDialog,
        }
    }

    pub fn is_submitted(&self) -> bool {
        matches!(self, Self::Submitted { .. })
    }
}

pub struct FormController {
    services: FormServices,
    observer: Arc<dyn FormObserver>,
    constants: BackendConstants,
    catalog: PlanCatalog,
    success_url: String,
}

impl FormController {
    pub fn new(
        services: FormServices,
        constants: BackendConstants,
        success_url: impl Into<String>,
    ) -> Self {
        Self {
            services,
            observer: Arc::new(TracingObserver),
            constants,
            catalog: PlanCatalog::default(),
            success_url: success_url.into(),
        }
    }

    pub fn with_observer(mut self, observer: Arc<dyn FormObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn catalog(&self) -> &PlanCatalog {
        &self.catalog
    }

    fn set_status(&self, session: &mut FormSession, status: SubmissionStatus) {
        self.observer.status_changed(&status);
        session.status = status;
    }

    /// Postal-code blur handler. Incomplete codes are ignored without a
    /// network call; lookup failures count as "not found".
    pub async fn lookup_postal_code(&self, session: &mut FormSession) -> PostalCodeStatus {
        let digits = unmask(&session.form.postal_code);
        if digits.len() != POSTAL_CODE_DIGITS {
            return session.field_status.postal_code;
        }

        self.set_status(session, SubmissionStatus::loading(MSG_SEARCHING_POSTAL_CODE));
        let result = match self.services.address_lookup.lookup(&digits).await {
            Ok(result) => result,
            Err(error) => {
                self.observer.address_lookup_failed(&digits, &error);
                AddressLookupResult::NotFound
            }
        };

        match result {
            AddressLookupResult::Found(address) => {
                session.form.merge_address(address);
                session.field_status.postal_code = PostalCodeStatus::Found;
                self.set_status(session, SubmissionStatus::idle());
            }
            AddressLookupResult::NotFound => {
                session.field_status.postal_code = PostalCodeStatus::NotFound;
                self.set_status(session, SubmissionStatus::warning(MSG_POSTAL_CODE_NOT_FOUND));
            }
        }
        session.field_status.postal_code
    }

    /// Tax-id / birth-date blur handler. Runs only once the CPF is fully
    /// typed and a birth date is present. A failed check leaves the status
    /// untouched (fails open); the submission backend has the final word.
    pub async fn check_tax_id(&self, session: &mut FormSession) -> TaxIdStatus {
        if !is_complete_tax_id(&session.form.tax_id) {
            return session.field_status.tax_id;
        }
        let Some(birth_date) = session.form.parsed_birth_date() else {
            return session.field_status.tax_id;
        };

        if !tax_id_checksum_valid(&session.form.tax_id) {
            session.field_status.tax_id = TaxIdStatus::Invalid;
            self.set_status(session, SubmissionStatus::error(MSG_INVALID_TAX_ID));
            return TaxIdStatus::Invalid;
        }

        self.set_status(session, SubmissionStatus::loading(MSG_VALIDATING_TAX_ID));
        let digits = unmask(&session.form.tax_id);
        match self.services.duplicate_check.check(&digits, birth_date).await {
            Ok(check) if check.registered => {
                session.field_status.tax_id = TaxIdStatus::Exists;
                if let Some(name) = check.registrant_name.filter(|name| !name.trim().is_empty()) {
                    session.form.full_name = name;
                    session.name_locked = true;
                }
                self.set_status(session, SubmissionStatus::error(MSG_TAX_ID_EXISTS));
            }
            Ok(_) => {
                session.field_status.tax_id = TaxIdStatus::Valid;
                self.set_status(session, SubmissionStatus::idle());
            }
            Err(error) => {
                self.observer.duplicate_check_failed(&error);
                self.set_status(session, SubmissionStatus::idle());
            }
        }
        session.field_status.tax_id
    }

    fn gate(&self, session: &mut FormSession) -> Result<(), GateRejection> {
        if session.field_status.tax_id == TaxIdStatus::Exists {
            return Err(GateRejection::DuplicateTaxId);
        }
        if session.form.chip_type == ChipType::ESim {
            session.form.shipping_method = Some(ShippingMethod::ESim);
        } else if session.form.shipping_method.is_none() {
            return Err(GateRejection::MissingShippingMethod);
        }
        if !session.form.has_plan() {
            return Err(GateRejection::MissingPlan);
        }
        Ok(())
    }

    /// Submit handler: gate, post, then either attach the success dialog and
    /// fire the webhook, or surface the failure inline.
    pub async fn submit(&self, session: &mut FormSession) -> SubmitOutcome {
        if let Err(rejection) = self.gate(session) {
            if rejection == GateRejection::DuplicateTaxId {
                self.set_status(session, SubmissionStatus::error(rejection.message()));
            }
            return SubmitOutcome::Rejected(rejection);
        }

        self.set_status(session, SubmissionStatus::loading(MSG_SUBMITTING));
        let payload = RegistrationPayload::build(&session.form, &self.constants);

        match self.services.gateway.submit(&payload).await {
            Ok(receipt) => {
                self.set_status(session, SubmissionStatus::idle());
                let summary = WebhookSummary::from_form(&session.form, &self.catalog);
                let notification = self.dispatch_notification(summary);

                session.form = Default::default();
                session.field_status = FieldStatus::default();
                session.name_locked = false;
                session.success_dialog = Some(SuccessDialog::new(self.success_url.clone()));

                SubmitOutcome::Submitted { receipt, notification }
            }
            Err(error) => {
                self.observer.submission_failed(&error);
                let message = if error == SubmissionError::DuplicateTaxId {
                    session.field_status.tax_id = TaxIdStatus::Exists;
                    MSG_SUBMIT_DUPLICATE
                } else {
                    MSG_SUBMIT_FAILED
                };
                self.set_status(session, SubmissionStatus::error(message));
                SubmitOutcome::Failed(error)
            }
        }
    }

    fn dispatch_notification(&self, summary: WebhookSummary) -> NotificationHandle {
        let notifier = Arc::clone(&self.services.notifier);
        let observer = Arc::clone(&self.observer);
        let task_observer = Arc::clone(&observer);
        let task = tokio::spawn(async move {
            if let Err(error) = notifier.notify(&summary).await {
                task_observer.notification_failed(&error);
            }
        });
        NotificationHandle { task, observer }
    }
}
