//! Test harness: an application state backed by an in-memory SQLite database
//! with the embedded migrations applied, plus fixture seeding helpers.

use std::sync::Arc;

use chrono::Utc;
use sea_orm::{ActiveModelTrait, ConnectOptions, Database, Set};
use sea_orm_migration::MigratorTrait;
use storefront_api::{
    auth::{AuthService, UserContext, ROLE_ADMIN, ROLE_USER},
    config::AppConfig,
    entities::{bank, cart, cart_item, product},
    events::EventSender,
    handlers::AppServices,
    migrator::Migrator,
    services::orders::ProofPolicy,
    storage::{DiskProofStore, ProofStore},
    AppState,
};
use tempfile::TempDir;
use tokio::sync::mpsc;
use uuid::Uuid;

/// Proof bounds used by tests; small so fixtures stay small. The mechanism
/// under test is the same regardless of the configured numbers.
pub const TEST_PROOF_MIN: usize = 1024;
pub const TEST_PROOF_MAX: usize = 4096;

pub struct TestApp {
    pub state: Arc<AppState>,
    /// Keeps the uploaded-file directory alive for the test's duration.
    pub upload_dir: TempDir,
    _event_task: tokio::task::JoinHandle<()>,
}

impl TestApp {
    /// Construct a test application with fresh database state and a disk
    /// proof store rooted in a temporary directory.
    pub async fn new() -> Self {
        let upload_dir = TempDir::new().expect("tempdir");
        let store = Arc::new(DiskProofStore::new(upload_dir.path()));
        Self::with_proof_store(upload_dir, store).await
    }

    /// Construct a test application around a caller-supplied proof store,
    /// e.g. one that fails on purpose.
    pub async fn with_proof_store(upload_dir: TempDir, store: Arc<dyn ProofStore>) -> Self {
        // A single connection: each pooled connection to sqlite::memory:
        // would otherwise get its own empty database.
        let mut options = ConnectOptions::new("sqlite::memory:".to_string());
        options.max_connections(1).min_connections(1);
        let db = Database::connect(options)
            .await
            .expect("failed to open test database");
        Migrator::up(&db, None).await.expect("migrations");
        let db = Arc::new(db);

        let cfg = AppConfig::new(
            "sqlite::memory:".into(),
            "test_secret_key_for_testing_purposes_only_32chars".into(),
            "127.0.0.1".into(),
            18_080,
        );

        let (event_tx, event_rx) = mpsc::channel(64);
        let event_sender = EventSender::new(event_tx);
        let event_task = tokio::spawn(storefront_api::events::process_events(event_rx));

        let auth = Arc::new(AuthService::new(&cfg.jwt_secret, cfg.jwt_expiration));

        let services = AppServices::new(
            db.clone(),
            Arc::new(event_sender.clone()),
            store,
            ProofPolicy {
                min_bytes: TEST_PROOF_MIN,
                max_bytes: TEST_PROOF_MAX,
            },
        );

        let state = Arc::new(AppState {
            db,
            config: cfg,
            auth,
            event_sender,
            services,
        });

        Self {
            state,
            upload_dir,
            _event_task: event_task,
        }
    }

    pub fn db(&self) -> &sea_orm::DatabaseConnection {
        self.state.db.as_ref()
    }

    /// Seeds a user row and returns the matching identity context.
    pub async fn seed_user(&self, name: &str, role: &str) -> UserContext {
        let id = Uuid::new_v4();
        let email = format!("{}@example.com", name.to_lowercase());
        let now = Utc::now();
        storefront_api::entities::user::ActiveModel {
            id: Set(id),
            name: Set(name.to_string()),
            email: Set(email.clone()),
            role: Set(role.to_string()),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(self.db())
        .await
        .expect("seed user");

        UserContext {
            user_id: id,
            name: name.to_string(),
            email,
            role: role.to_string(),
        }
    }

    pub async fn seed_customer(&self) -> UserContext {
        self.seed_user("Customer", ROLE_USER).await
    }

    pub async fn seed_admin(&self) -> UserContext {
        self.seed_user("Admin", ROLE_ADMIN).await
    }

    pub async fn seed_product(&self, name: &str, price: i64, published: bool) -> product::Model {
        let now = Utc::now();
        product::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(name.to_string()),
            description: Set(None),
            price: Set(price),
            stock: Set(10),
            category_id: Set(None),
            is_featured: Set(false),
            is_published: Set(published),
            specifications: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(self.db())
        .await
        .expect("seed product")
    }

    pub async fn seed_bank(&self, owner: &UserContext, name: &str) -> bank::Model {
        let now = Utc::now();
        bank::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(name.to_string()),
            account_number: Set("1234567890".to_string()),
            account_holder: Set("PT Storefront".to_string()),
            is_active: Set(true),
            user_id: Set(owner.user_id),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(self.db())
        .await
        .expect("seed bank")
    }

    pub async fn seed_cart(&self, owner: &UserContext, name: &str) -> cart::Model {
        let now = Utc::now();
        cart::ActiveModel {
            id: Set(Uuid::new_v4()),
            user_id: Set(owner.user_id),
            cart_name: Set(name.to_string()),
            schedule: Set(now),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(self.db())
        .await
        .expect("seed cart")
    }

    pub async fn seed_cart_item(
        &self,
        cart: &cart::Model,
        product: &product::Model,
        qty: i32,
    ) -> cart_item::Model {
        let now = Utc::now();
        cart_item::ActiveModel {
            id: Set(Uuid::new_v4()),
            cart_id: Set(cart.id),
            product_id: Set(product.id),
            qty: Set(qty),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(self.db())
        .await
        .expect("seed cart item")
    }
}
