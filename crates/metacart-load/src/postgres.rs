//! PostgreSQL executor
//!
//! The one driver bundled with the loader. Connects with tokio-postgres,
//! optionally over TLS via native-tls. Connections run in autocommit
//! mode, which matches the loader's statement-at-a-time contract.
//!
//! Built behind the `postgres` cargo feature; without it the constructor
//! returns a configuration error explaining how to rebuild.

use crate::executor::{ExecutorError, SqlExecutor, SqlValue};
use async_trait::async_trait;

#[cfg(feature = "postgres")]
use metacart_core::parse_timestamp;

#[cfg(feature = "postgres")]
use tokio_postgres::{
    types::{ToSql, Type},
    Client, NoTls, SimpleQueryMessage,
};

#[cfg(feature = "postgres")]
use postgres_native_tls::MakeTlsConnector;

#[cfg(feature = "postgres")]
use native_tls::TlsConnector;

/// Driver-backed executor for PostgreSQL
pub struct PostgresExecutor {
    #[cfg(feature = "postgres")]
    client: Client,

    #[cfg(not(feature = "postgres"))]
    _phantom: std::marker::PhantomData<()>,
}

impl PostgresExecutor {
    /// Connect without TLS.
    ///
    /// `url` is a keyword/value connection string (host, port, dbname);
    /// credentials are appended from the config's own keys.
    #[cfg(feature = "postgres")]
    pub async fn connect(url: &str, user: &str, password: &str) -> Result<Self, ExecutorError> {
        let config = format!("{} user={} password={}", url, user, password);

        let (client, connection) = tokio_postgres::connect(&config, NoTls)
            .await
            .map_err(|e| {
                ExecutorError::ConnectionFailed(format!("cannot connect to PostgreSQL: {}", e))
            })?;

        tokio::spawn(async move {
            if let Err(e) = connection.await {
                tracing::error!("PostgreSQL connection error: {}", e);
            }
        });

        Ok(Self { client })
    }

    /// Connect without the postgres feature (returns an error)
    #[cfg(not(feature = "postgres"))]
    pub async fn connect(_url: &str, _user: &str, _password: &str) -> Result<Self, ExecutorError> {
        Err(ExecutorError::ConfigError(
            "PostgreSQL support not compiled. Rebuild with: cargo build --features postgres"
                .to_string(),
        ))
    }

    /// Connect over TLS
    #[cfg(feature = "postgres")]
    pub async fn connect_with_tls(
        url: &str,
        user: &str,
        password: &str,
    ) -> Result<Self, ExecutorError> {
        let config = format!("{} user={} password={}", url, user, password);

        let connector = TlsConnector::builder().build().map_err(|e| {
            ExecutorError::ConnectionFailed(format!("cannot create TLS connector: {}", e))
        })?;
        let tls = MakeTlsConnector::new(connector);

        let (client, connection) = tokio_postgres::connect(&config, tls).await.map_err(|e| {
            ExecutorError::ConnectionFailed(format!("cannot connect to PostgreSQL: {}", e))
        })?;

        tokio::spawn(async move {
            if let Err(e) = connection.await {
                tracing::error!("PostgreSQL connection error: {}", e);
            }
        });

        Ok(Self { client })
    }

    /// Connect over TLS without the postgres feature (returns an error)
    #[cfg(not(feature = "postgres"))]
    pub async fn connect_with_tls(
        _url: &str,
        _user: &str,
        _password: &str,
    ) -> Result<Self, ExecutorError> {
        Err(ExecutorError::ConfigError(
            "PostgreSQL support not compiled. Rebuild with: cargo build --features postgres"
                .to_string(),
        ))
    }
}

/// Bind one parameter for the declared statement type. The loader's
/// coercion step has already shaped the values, so this only bridges the
/// remaining representation gaps: timestamp columns arrive as ISO-8601
/// text, nulls need the column's type.
#[cfg(feature = "postgres")]
fn bind_param(value: &SqlValue, ty: &Type) -> Box<dyn ToSql + Sync> {
    match value {
        SqlValue::Null => {
            if *ty == Type::INT8 || *ty == Type::INT4 {
                Box::new(None::<i64>)
            } else if *ty == Type::FLOAT8 || *ty == Type::FLOAT4 {
                Box::new(None::<f64>)
            } else if *ty == Type::BOOL {
                Box::new(None::<bool>)
            } else if *ty == Type::TIMESTAMP {
                Box::new(None::<chrono::NaiveDateTime>)
            } else {
                Box::new(None::<String>)
            }
        }
        SqlValue::Int(value) => {
            if *ty == Type::FLOAT8 || *ty == Type::FLOAT4 {
                Box::new(*value as f64)
            } else if *ty == Type::INT4 {
                Box::new(*value as i32)
            } else if *ty == Type::INT8 {
                Box::new(*value)
            } else {
                Box::new(value.to_string())
            }
        }
        SqlValue::Float(value) => {
            if *ty == Type::FLOAT8 || *ty == Type::FLOAT4 {
                Box::new(*value)
            } else {
                Box::new(value.to_string())
            }
        }
        SqlValue::Bool(value) => {
            if *ty == Type::BOOL {
                Box::new(*value)
            } else {
                Box::new(value.to_string())
            }
        }
        SqlValue::Text(value) => {
            if *ty == Type::TIMESTAMP {
                match parse_timestamp(value) {
                    Some(datetime) => Box::new(datetime),
                    None => Box::new(None::<chrono::NaiveDateTime>),
                }
            } else {
                Box::new(value.clone())
            }
        }
    }
}

#[async_trait]
impl SqlExecutor for PostgresExecutor {
    #[cfg(feature = "postgres")]
    async fn execute(&mut self, sql: &str) -> Result<Vec<Vec<SqlValue>>, ExecutorError> {
        // The simple query protocol covers everything the loader sends
        // here (DDL and catalog lookups) and returns text columns, which
        // is all the callers inspect.
        let messages = self
            .client
            .simple_query(sql)
            .await
            .map_err(|e| ExecutorError::StatementFailed(format!("{}: {}", sql, e)))?;

        let mut rows = Vec::new();
        for message in messages {
            if let SimpleQueryMessage::Row(row) = message {
                let mut values = Vec::with_capacity(row.len());
                for index in 0..row.len() {
                    values.push(match row.get(index) {
                        Some(text) => SqlValue::Text(text.to_string()),
                        None => SqlValue::Null,
                    });
                }
                rows.push(values);
            }
        }
        Ok(rows)
    }

    #[cfg(not(feature = "postgres"))]
    async fn execute(&mut self, _sql: &str) -> Result<Vec<Vec<SqlValue>>, ExecutorError> {
        Err(ExecutorError::ConfigError(
            "PostgreSQL support not compiled. Rebuild with: cargo build --features postgres"
                .to_string(),
        ))
    }

    #[cfg(feature = "postgres")]
    async fn execute_batch(
        &mut self,
        sql: &str,
        rows: &[Vec<SqlValue>],
    ) -> Result<(), ExecutorError> {
        let statement = self
            .client
            .prepare(sql)
            .await
            .map_err(|e| ExecutorError::StatementFailed(format!("{}: {}", sql, e)))?;
        let types = statement.params().to_vec();

        for row in rows {
            let bound: Vec<Box<dyn ToSql + Sync>> = row
                .iter()
                .zip(&types)
                .map(|(value, ty)| bind_param(value, ty))
                .collect();
            let params: Vec<&(dyn ToSql + Sync)> =
                bound.iter().map(AsRef::as_ref).collect();

            self.client
                .execute(&statement, &params)
                .await
                .map_err(|e| ExecutorError::StatementFailed(format!("{}: {}", sql, e)))?;
        }
        Ok(())
    }

    #[cfg(not(feature = "postgres"))]
    async fn execute_batch(
        &mut self,
        _sql: &str,
        _rows: &[Vec<SqlValue>],
    ) -> Result<(), ExecutorError> {
        Err(ExecutorError::ConfigError(
            "PostgreSQL support not compiled. Rebuild with: cargo build --features postgres"
                .to_string(),
        ))
    }

    async fn commit(&mut self) -> Result<(), ExecutorError> {
        // Nothing to do: the connection runs in autocommit mode and no
        // explicit transaction is ever opened.
        Ok(())
    }
}
