pub mod gateway;
pub mod mailer;
pub mod stripe;

pub use gateway::{CheckoutSession, PaymentGateway};
pub use mailer::{HttpMailer, Mailer};
pub use stripe::StripeClient;
