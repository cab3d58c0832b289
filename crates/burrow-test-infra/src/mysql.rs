use crate::Result;
use testcontainers::core::{IntoContainerPort, WaitFor};
use testcontainers::runners::AsyncRunner;
use testcontainers::{ContainerAsync, GenericImage, ImageExt};
use typed_builder::TypedBuilder;

/// Scripts in this directory run once, before the server accepts TCP clients.
const INIT_SCRIPT_PATH: &str = "/docker-entrypoint-initdb.d/schema.sql";

#[derive(Debug, TypedBuilder)]
pub struct MysqlConfig {
    #[builder(default = "8.4".to_string(), setter(into))]
    image_tag: String,
    #[builder(default = "burrow".to_string(), setter(into))]
    database: String,
    #[builder(default = "burrow".to_string(), setter(into))]
    credentials: String,
    /// DDL applied to `database` during container initialisation.
    #[builder(default, setter(strip_option, into))]
    schema: Option<String>,
}

/// A throwaway MySQL server whose user and password are both `credentials`.
pub struct MySqlServer {
    container: ContainerAsync<GenericImage>,
    database: String,
    credentials: String,
}

impl MySqlServer {
    pub async fn new(config: MysqlConfig) -> Result<Self> {
        let mut request = GenericImage::new("mysql", config.image_tag.as_str())
            .with_exposed_port(3306_u16.tcp())
            .with_wait_for(WaitFor::message_on_stderr("ready for connections"))
            .with_env_var("MYSQL_DATABASE", config.database.as_str())
            .with_env_var("MYSQL_USER", config.credentials.as_str())
            .with_env_var("MYSQL_PASSWORD", config.credentials.as_str())
            .with_env_var("MYSQL_RANDOM_ROOT_PASSWORD", "yes");

        if let Some(schema) = config.schema {
            request = request.with_copy_to(INIT_SCRIPT_PATH, schema.into_bytes());
        }

        Ok(Self {
            container: request.start().await?,
            database: config.database,
            credentials: config.credentials,
        })
    }

    /// Connection URL for the test user. The server may still be finishing
    /// initialisation, so callers should retry the first connect.
    pub async fn database_url(&self) -> Result<String> {
        let host = match self.container.get_host().await?.to_string().as_str() {
            "localhost" => String::from("127.0.0.1"),
            host => host.to_string(),
        };
        let port = self.container.get_host_port_ipv4(3306).await?;
        Ok(format!(
            "mysql://{user}:{user}@{host}:{port}/{db}",
            user = self.credentials,
            db = self.database
        ))
    }
}
