//! Alert delivery for Stormwatch.
//!
//! Provides the Twilio SMS and SMTP email channels and the dispatcher that
//! fans an alert out to both.

pub mod channel;
pub mod dispatcher;
pub mod email;
pub mod error;
pub mod sms;

pub use channel::{validate_email, validate_phone, ChannelKind, Contact, NotificationChannel};
pub use dispatcher::{DispatchResult, Dispatcher};
pub use email::SmtpEmail;
pub use error::ChannelFault;
pub use sms::{SmsReceipt, TwilioSms};
