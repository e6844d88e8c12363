pub mod controller;
pub mod state;

pub use controller::{
    FormController, FormServices, GateRejection, NotificationHandle, SubmitOutcome, UiEffect,
};
pub use state::{
    FieldStatus, FormField, FormSession, PostalCodeStatus, StatusKind, SubmissionStatus,
    SuccessDialog, TaxIdStatus,
};
