use sea_orm::{ConnectionTrait, Database, DatabaseConnection};
use testcontainers_modules::testcontainers::runners::AsyncRunner;
use testcontainers_modules::{mysql, testcontainers};

const SCHEMA: &str = include_str!("../../schema.sql");

pub async fn setup_container() -> anyhow::Result<testcontainers::ContainerAsync<mysql::Mysql>> {
    let container = mysql::Mysql::default().start().await?;
    Ok(container)
}

pub async fn setup_db(
    container: &testcontainers::ContainerAsync<mysql::Mysql>,
) -> anyhow::Result<DatabaseConnection> {
    let host = container.get_host().await?;
    let port = container.get_host_port_ipv4(3306).await?;
    let db_url = format!("mysql://root@{}:{}/test", host, port);
    let db = Database::connect(&db_url).await?;
    db.execute_unprepared(SCHEMA).await?;
    Ok(db)
}
