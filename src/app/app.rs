use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use axum::extract::DefaultBodyLimit;
use axum::routing::get;
use axum::Router;
use tracing::{error, info, warn};

use crate::config::{AdminUserConfig, AppConfig, ConfigError, JwtConfig, MongoConfig, SessionConfig, StorageKind};
use crate::handler::auth_handler::AuthState;
use crate::handler::user_html_handler::UserHtmlState;
use crate::middlewares::admin_middleware::AdminAuthState;
use crate::repository::memory::{MemoryStaffPermissionDao, MemoryStaffRepository, MemoryUserRepository};
use crate::repository::mongo;
use crate::repository::staff_permission_dao::{MongoStaffPermissionDao, StaffPermissionDao};
use crate::repository::staff_repo::{MongoStaffRepository, StaffRepository};
use crate::repository::user_repo::{MongoUserRepository, UserRepository};
use crate::router::auth_router::auth_router;
use crate::router::user_router::user_router;
use crate::service::auth_service::{AuthService, AuthServiceImpl};
use crate::service::user_service::UserServiceImpl;
use crate::util::error::ServiceError;
use crate::util::jwt::JwtTokenUtilsImpl;
use crate::util::multipart::MAX_REQUEST_BYTES;
use crate::util::session::FormSessionStore;
use crate::util::template::Templates;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("Database error: {0}")]
    Database(#[from] mongodb::error::Error),
    #[error("Template error: {0}")]
    Template(#[from] tera::Error),
    #[error("Bootstrap error: {0}")]
    Bootstrap(#[from] ServiceError),
    #[error("Server error: {0}")]
    Io(#[from] std::io::Error),
}

/// The data-access seams the application runs on.
#[derive(Clone)]
pub struct Backend {
    pub user_repo: Arc<dyn UserRepository>,
    pub staff_repo: Arc<dyn StaffRepository>,
    pub permission_dao: Arc<dyn StaffPermissionDao>,
}

impl Backend {
    pub fn memory() -> Self {
        let permissions = MemoryStaffPermissionDao::new();
        Backend {
            user_repo: Arc::new(MemoryUserRepository::new()),
            staff_repo: Arc::new(MemoryStaffRepository::new(permissions.clone())),
            permission_dao: Arc::new(permissions),
        }
    }

    pub async fn mongo(config: &MongoConfig) -> Result<Self, AppError> {
        let db = mongo::connect(config).await?;
        info!("Connected to MongoDB database {}", config.database);
        Ok(Backend {
            user_repo: Arc::new(MongoUserRepository::new(&db)),
            staff_repo: Arc::new(MongoStaffRepository::new(&db)),
            permission_dao: Arc::new(MongoStaffPermissionDao::new(&db)),
        })
    }
}

const SESSION_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

pub struct App {
    config: AppConfig,
    router: Router,
    sessions: Arc<FormSessionStore>,
    pub auth_service: Arc<AuthServiceImpl>,
}

impl App {
    /// Builds the application from environment configuration.
    pub async fn new() -> Result<Self, AppError> {
        let config = AppConfig::from_env()?;
        let jwt_config = JwtConfig::from_env()?;
        let session_config = SessionConfig::from_env()?;

        let backend = match config.storage {
            StorageKind::Mongo => Backend::mongo(&MongoConfig::from_env()?).await?,
            StorageKind::Memory => {
                warn!("Using in-memory storage; data is lost on restart");
                Backend::memory()
            }
        };

        let app = App::with_backend(config, backend, jwt_config, session_config)?;
        app.create_first_admin().await;
        Ok(app)
    }

    pub fn with_backend(
        config: AppConfig,
        backend: Backend,
        jwt_config: JwtConfig,
        session_config: SessionConfig,
    ) -> Result<Self, AppError> {
        let templates = Arc::new(Templates::new()?);
        let jwt_utils = Arc::new(JwtTokenUtilsImpl::new(jwt_config));
        let auth_service = Arc::new(AuthServiceImpl::new(backend.staff_repo.clone(), jwt_utils.clone()));
        let sessions = Arc::new(FormSessionStore::new(&session_config));

        let user_state = Arc::new(UserHtmlState {
            user_service: Arc::new(UserServiceImpl::new(backend.user_repo.clone())),
            sessions: sessions.clone(),
            templates: templates.clone(),
        });
        let auth_state = Arc::new(AuthState { auth_service: auth_service.clone(), templates });
        let admin_auth_state = Arc::new(AdminAuthState {
            jwt_utils,
            permission_dao: backend.permission_dao.clone(),
        });

        let router = Router::new()
            .merge(auth_router(auth_state))
            .merge(user_router(user_state, admin_auth_state))
            .route("/health", get(|| async { "OK" }))
            .layer(DefaultBodyLimit::max(MAX_REQUEST_BYTES));

        Ok(App { config, router, sessions, auth_service })
    }

    pub fn router(&self) -> Router {
        self.router.clone()
    }

    pub async fn start(self) -> Result<(), AppError> {
        let host: IpAddr = self
            .config
            .host
            .parse()
            .map_err(|_| ConfigError::InvalidValue(format!("APP_HOST: {}", self.config.host)))?;
        let addr = SocketAddr::new(host, self.config.port);
        info!("Server running at http://{}", addr);
        let listener = tokio::net::TcpListener::bind(addr).await?;
        self.spawn_session_sweeper();
        axum::serve(listener, self.router).await?;
        Ok(())
    }

    fn spawn_session_sweeper(&self) {
        let sessions = self.sessions.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(SESSION_SWEEP_INTERVAL);
            loop {
                interval.tick().await;
                sessions.cleanup();
            }
        });
    }

    async fn create_first_admin(&self) {
        let admin_conf = match AdminUserConfig::from_env() {
            Ok(c) => c,
            Err(e) => {
                warn!("Admin user config not loaded: {e}");
                return;
            }
        };
        match self.auth_service.bootstrap_admin(&admin_conf).await {
            Ok(true) => info!("First admin staff created."),
            Ok(false) => {}
            Err(e) => error!("Failed to create admin staff: {e}"),
        }
    }
}
