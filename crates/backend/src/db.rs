use anyhow::Context;
use async_trait::async_trait;
use chrono::Utc;
use diesel::prelude::*;
use diesel_async::{
    pooled_connection::{
        deadpool::{Object, Pool},
        AsyncDieselConnectionManager, ManagerConfig,
    },
    AsyncPgConnection, RunQueryDsl,
};

use crate::models::{NewUser, User};
use crate::repository::{GoogleLogin, UserStore};

pub type DbPool = Pool<AsyncPgConnection>;

async fn establish_tls_connection(config: String) -> diesel::ConnectionResult<AsyncPgConnection> {
    // Set up rustls TLS configuration
    let root_store =
        rustls::RootCertStore::from_iter(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
    let tls_config = rustls::ClientConfig::builder()
        .with_root_certificates(root_store)
        .with_no_client_auth();
    let tls = tokio_postgres_rustls::MakeRustlsConnect::new(tls_config);

    // Parse the connection string and connect with TLS
    let (client, connection) = tokio_postgres::connect(&config, tls)
        .await
        .map_err(|e| diesel::ConnectionError::BadConnection(e.to_string()))?;

    // Spawn the connection task
    tokio::spawn(async move {
        if let Err(e) = connection.await {
            tracing::error!("Connection error: {}", e);
        }
    });

    AsyncPgConnection::try_from(client).await
}

pub fn establish_connection_pool(database_url: &str) -> anyhow::Result<DbPool> {
    let mut manager_config = ManagerConfig::default();
    manager_config.custom_setup =
        Box::new(|url| Box::pin(establish_tls_connection(url.to_string())));

    let config = AsyncDieselConnectionManager::<AsyncPgConnection>::new_with_config(
        database_url,
        manager_config,
    );
    let pool = Pool::builder(config)
        .build()
        .context("Failed to build database pool")?;

    Ok(pool)
}

pub async fn get_conn(pool: &DbPool) -> anyhow::Result<Object<AsyncPgConnection>> {
    pool.get().await.context("Failed to get DB connection")
}

// User database operations
pub mod users {
    use super::*;

    pub async fn find_by_email(
        conn: &mut AsyncPgConnection,
        email_addr: &str,
    ) -> anyhow::Result<Option<User>> {
        use crate::schema::users::dsl::*;

        let user = users
            .filter(email.eq(email_addr))
            .select(User::as_select())
            .first(conn)
            .await
            .optional()?;

        Ok(user)
    }

    /// Insert the user or update tokens on an existing row.
    ///
    /// A missing refresh token leaves the stored one untouched.
    pub async fn upsert_login(
        conn: &mut AsyncPgConnection,
        login: &GoogleLogin,
    ) -> anyhow::Result<User> {
        use crate::schema::users::dsl::*;

        let new_user = NewUser {
            email: &login.email,
            name: login.name.as_deref(),
            access_token: Some(&login.access_token),
            refresh_token: login.refresh_token.as_deref(),
            token_expires_at: login.expires_at,
        };
        let now = Utc::now();

        let user = match login.refresh_token.as_deref() {
            Some(new_refresh_token) => {
                diesel::insert_into(users)
                    .values(&new_user)
                    .on_conflict(email)
                    .do_update()
                    .set((
                        name.eq(login.name.as_deref()),
                        access_token.eq(Some(login.access_token.as_str())),
                        refresh_token.eq(Some(new_refresh_token)),
                        token_expires_at.eq(login.expires_at),
                        updated_at.eq(now),
                    ))
                    .returning(User::as_returning())
                    .get_result(conn)
                    .await?
            }
            None => {
                diesel::insert_into(users)
                    .values(&new_user)
                    .on_conflict(email)
                    .do_update()
                    .set((
                        name.eq(login.name.as_deref()),
                        access_token.eq(Some(login.access_token.as_str())),
                        token_expires_at.eq(login.expires_at),
                        updated_at.eq(now),
                    ))
                    .returning(User::as_returning())
                    .get_result(conn)
                    .await?
            }
        };

        Ok(user)
    }
}

/// [`UserStore`] backed by the Postgres pool
#[derive(Clone)]
pub struct PgUserStore {
    pool: DbPool,
}

impl PgUserStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn find_by_email(&self, email: &str) -> anyhow::Result<Option<User>> {
        let mut conn = get_conn(&self.pool).await?;
        users::find_by_email(&mut conn, email).await
    }

    async fn save_login(&self, login: &GoogleLogin) -> anyhow::Result<User> {
        let mut conn = get_conn(&self.pool).await?;
        let user = users::upsert_login(&mut conn, login).await?;
        tracing::info!("Stored Google tokens for {}", user.email);
        Ok(user)
    }
}
