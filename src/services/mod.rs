pub mod auth_service;
pub mod auth_service_impl;
pub use auth_service::{AuthError, AuthService, LoginResult};
pub use auth_service_impl::SeaOrmAuthService;

pub mod subscription_service;
pub mod subscription_service_impl;
pub use subscription_service::{SubscriptionError, SubscriptionService};
pub use subscription_service_impl::SeaOrmSubscriptionService;

pub mod payment_service;
pub mod payment_service_impl;
pub use payment_service::{NewPayment, PaymentError, PaymentMethod, PaymentService};
pub use payment_service_impl::SeaOrmPaymentService;
