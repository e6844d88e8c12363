pub mod config;
pub mod domain;
pub mod errors;
pub mod form;
pub mod masks;
pub mod ports;
pub mod submission;
pub mod webhook;

pub use domain::address::{Address, AddressLookupResult};
pub use domain::plan::{Carrier, Plan, PlanCatalog};
pub use domain::registration::{ChipType, RegistrationForm, ShippingMethod};
pub use errors::{ApplicationError, DomainError, InterfaceError};
pub use form::{
    FieldStatus, FormController, FormField, FormServices, FormSession, GateRejection,
    NotificationHandle, PostalCodeStatus, StatusKind, SubmissionStatus, SubmitOutcome,
    SuccessDialog, TaxIdStatus, UiEffect,
};
pub use ports::{
    AddressLookup, DuplicateCheck, FormObserver, LookupError, NotifyError, RegistrationGateway,
    SubmissionError, SubmissionReceipt, TaxIdCheck, TracingObserver, WebhookNotifier,
};
pub use submission::{BackendConstants, RegistrationPayload};
pub use webhook::WebhookSummary;
