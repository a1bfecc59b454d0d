pub mod config {
    use serde::Deserialize;

    #[derive(Deserialize, Debug, Clone)]
    pub struct Config {
        pub mysql_host: String,
        #[serde(default = "default_mysql_port")]
        pub mysql_port: u16,
        pub mysql_user: String,
        pub mysql_password: String,
        pub mysql_database: String,
        #[serde(default = "default_port")]
        pub port: u16,
        #[serde(default = "default_max_connections")]
        pub max_connections: u32,
        #[serde(default = "default_request_timeout_secs")]
        pub request_timeout_secs: u64,
    }

    impl Config {
        /// Loads configuration from environment variables.
        pub fn from_env() -> anyhow::Result<Self> {
            Self::from_source(config::Environment::default())
        }

        /// Loads configuration from an arbitrary environment source.
        pub fn from_source(source: config::Environment) -> anyhow::Result<Self> {
            let settings = config::Config::builder().add_source(source).build()?;

            let config: Config = settings.try_deserialize()?;
            Ok(config)
        }

        /// Connection string for the task store.
        pub fn database_url(&self) -> String {
            format!(
                "mysql://{}:{}@{}:{}/{}",
                self.mysql_user,
                self.mysql_password,
                self.mysql_host,
                self.mysql_port,
                self.mysql_database
            )
        }
    }

    fn default_mysql_port() -> u16 {
        3306
    }

    fn default_port() -> u16 {
        8080
    }

    fn default_max_connections() -> u32 {
        10
    }

    fn default_request_timeout_secs() -> u64 {
        30
    }

}
pub mod response;
pub mod task;
pub mod web;
