use std::sync::Arc;

use tokio::sync::RwLock;

use crate::clients::{HttpMailer, Mailer, PaymentGateway, StripeClient};
use crate::config::Config;
use crate::db::Store;
use crate::notify::{self, Notifier};
use crate::services::{
    AuthService, PaymentService, SeaOrmAuthService, SeaOrmPaymentService,
    SeaOrmSubscriptionService, SubscriptionService,
};

#[derive(Clone)]
pub struct SharedState {
    pub config: Arc<RwLock<Config>>,

    pub store: Store,

    pub auth_service: Arc<dyn AuthService>,

    pub subscription_service: Arc<dyn SubscriptionService>,

    pub payment_service: Arc<dyn PaymentService>,

    pub notifier: Notifier,
}

impl SharedState {
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        let gateway: Arc<dyn PaymentGateway> = Arc::new(StripeClient::new(&config.stripe)?);
        let mailer: Arc<dyn Mailer> = Arc::new(HttpMailer::new(&config.mail)?);
        Self::with_clients(config, gateway, mailer).await
    }

    /// Wire the state with explicit clients. Tests substitute mocks here.
    pub async fn with_clients(
        config: Config,
        gateway: Arc<dyn PaymentGateway>,
        mailer: Arc<dyn Mailer>,
    ) -> anyhow::Result<Self> {
        let store = Store::with_pool_options(
            &config.general.database_path,
            config.general.max_db_connections,
            config.general.min_db_connections,
        )
        .await?;

        let auth_service =
            Arc::new(SeaOrmAuthService::new(store.clone())) as Arc<dyn AuthService>;
        let subscription_service = Arc::new(SeaOrmSubscriptionService::new(store.clone()))
            as Arc<dyn SubscriptionService>;
        let payment_service = Arc::new(SeaOrmPaymentService::new(store.clone(), gateway))
            as Arc<dyn PaymentService>;

        let notifier = notify::start_worker(store.clone(), mailer);

        Ok(Self {
            config: Arc::new(RwLock::new(config)),
            store,
            auth_service,
            subscription_service,
            payment_service,
            notifier,
        })
    }

    pub async fn config(&self) -> Config {
        self.config.read().await.clone()
    }
}
