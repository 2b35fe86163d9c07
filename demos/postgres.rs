use std::time::Duration;

use sentmail::store::sqlx::PgAuditStore;
use sentmail::{
    AuditLog, BeforeMailSent, BeforeMailSentEvent, Email, MailAuditRecorder, MailSettings,
};
use sqlx::PgPool;
use sqlx::postgres::PgConnectOptions;
use tracing_error::ErrorLayer;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::prelude::*;

const SETTINGS: &str = r#"
transport = "smtp"
transport_smtp_server = "mail.example.com:587"
transport_smtp_username = "mailer"
transport_smtp_password = "secret"
defaultMailFromAddress = "noreply@example.com"
"#;

#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();

    let fmt_layer = tracing_subscriber::fmt::layer().with_target(false);
    tracing_subscriber::registry()
        .with(fmt_layer)
        .with(EnvFilter::from_default_env())
        .with(ErrorLayer::default())
        .init();

    // Postgres connection, configured through the PG* environment variables
    let pool = PgPool::connect_with(PgConnectOptions::new()).await.unwrap();

    let store = PgAuditStore::try_new(pool).await.unwrap();
    let settings = MailSettings::from_toml_str(SETTINGS).unwrap();
    let recorder = MailAuditRecorder::new(store.clone(), settings);
    let audit_log = AuditLog::new(store);

    let mut ticker = tokio::time::interval(Duration::from_millis(200));
    for n in 0..5 {
        ticker.tick().await;

        let email = Email::new()
            .with_from("noreply@example.com".parse().unwrap())
            .with_to("Jane Doe <jane@example.com>".parse().unwrap())
            .with_subject(format!("Hello #{n}"))
            .with_text("Hello from the demo");
        let mut event = BeforeMailSentEvent::new(email, None);

        recorder.before_mail_sent(&mut event).await;

        let Some(uid) = event
            .message()
            .headers()
            .get("X-SentMail_ID")
            .and_then(|id| id.parse::<i64>().ok())
        else {
            tracing::warn!("Mail was not recorded");
            continue;
        };

        let record = audit_log.fetch(&uid).await.unwrap();
        tracing::info!(uid, record = ?record, "Recorded mail");
    }
}
