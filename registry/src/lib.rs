use std::sync::Arc;

use adapter::provisioning::DocumentProvisioner;
use adapter::repository::session::SessionRepositoryImpl;
use kernel::repository::{
    document::DocumentStoreFactory, identity::IdentityProvider, session::SessionRepository,
    shop::ShopRepository,
};
use shared::config::AppConfig;

#[derive(Clone)]
pub struct AppRegistry {
    session_repository: Arc<dyn SessionRepository>,
    shop_repository: Arc<dyn ShopRepository>,
    document_provisioner: Arc<DocumentProvisioner>,
    identity_provider: Arc<dyn IdentityProvider>,
    app_config: Arc<AppConfig>,
}

impl AppRegistry {
    pub fn new(
        app_config: AppConfig,
        shop_repository: Arc<dyn ShopRepository>,
        document_factory: Arc<dyn DocumentStoreFactory>,
        identity_provider: Arc<dyn IdentityProvider>,
    ) -> Self {
        let session_repository = Arc::new(SessionRepositoryImpl::new(
            app_config.auth.session_max_age,
            app_config.auth.session_idle_timeout,
        ));
        let document_provisioner = Arc::new(DocumentProvisioner::new(
            document_factory,
            shop_repository.clone(),
        ));
        Self {
            session_repository,
            shop_repository,
            document_provisioner,
            identity_provider,
            app_config: Arc::new(app_config),
        }
    }

    pub fn session_repository(&self) -> Arc<dyn SessionRepository> {
        self.session_repository.clone()
    }

    pub fn shop_repository(&self) -> Arc<dyn ShopRepository> {
        self.shop_repository.clone()
    }

    pub fn document_provisioner(&self) -> Arc<DocumentProvisioner> {
        self.document_provisioner.clone()
    }

    pub fn identity_provider(&self) -> Arc<dyn IdentityProvider> {
        self.identity_provider.clone()
    }

    pub fn app_config(&self) -> Arc<AppConfig> {
        self.app_config.clone()
    }
}
