use crate::config::app_config::AccountConfig;
use crate::db::entity::user::Account;
use async_trait::async_trait;
use tracing::info;

/// Outgoing account messages. The account module only hands over the token
/// hash, the recipient and, for admin-created accounts, the generated password.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send_confirmation_email(
        &self,
        account: &Account,
        hash: &str,
        password: Option<&str>,
    ) -> Result<(), String>;

    async fn send_reopen_account_email(&self, account: &Account, hash: &str)
        -> Result<(), String>;

    async fn send_resetting_email(&self, account: &Account, hash: &str) -> Result<(), String>;

    async fn send_password_changed_email(
        &self,
        account: &Account,
        password: Option<&str>,
    ) -> Result<(), String>;
}

/// Notifier that writes the messages to the log instead of sending them.
pub struct LogNotifier {
    config: AccountConfig,
}

impl LogNotifier {
    pub fn new(config: AccountConfig) -> Self {
        Self { config }
    }

    fn deliver(&self, to_email: &str, subject: &str, body: &str) {
        // In a real application, you would implement SMTP email sending here.
        info!("Sending email to: {}", to_email);
        info!("Subject: {}", subject);
        info!("Body: {}", body);
    }
}

#[async_trait]
impl Notifier for LogNotifier {
    async fn send_confirmation_email(
        &self,
        account: &Account,
        hash: &str,
        password: Option<&str>,
    ) -> Result<(), String> {
        let link = self
            .config
            .token_url(&self.config.routes.confirm_account, hash);
        let mut body = format!(
            "Hello,\n\nPlease confirm your account by following the link below:\n\n{}\n",
            link
        );
        if let Some(password) = password {
            body.push_str(&format!("\nYour password is: {}\n", password));
        }
        body.push_str("\nRegards,\nYour Application Team");
        self.deliver(&account.email, "Confirm your account", &body);
        Ok(())
    }

    async fn send_reopen_account_email(
        &self,
        account: &Account,
        hash: &str,
    ) -> Result<(), String> {
        let link = self
            .config
            .token_url(&self.config.routes.reopen_account, hash);
        let body = format!(
            "Hello,\n\nYour account is closed. Follow the link below to reopen it:\n\n{}\n\nIf you did not request this, you can safely ignore this email.\n\nRegards,\nYour Application Team",
            link
        );
        self.deliver(&account.email, "Reopen your account", &body);
        Ok(())
    }

    async fn send_resetting_email(&self, account: &Account, hash: &str) -> Result<(), String> {
        let link = self
            .config
            .token_url(&self.config.routes.reset_password, hash);
        let body = format!(
            "Hello,\n\nYou have requested a password reset. Please click the link below to reset your password:\n\n{}\n\nIf you did not request this, you can safely ignore this email.\n\nThis link will expire in {} hours.\n\nRegards,\nYour Application Team",
            link,
            self.config.token_security_ttl / 3600
        );
        self.deliver(&account.email, "Password Reset Request", &body);
        Ok(())
    }

    async fn send_password_changed_email(
        &self,
        account: &Account,
        password: Option<&str>,
    ) -> Result<(), String> {
        let login = format!(
            "{}{}",
            self.config.base_url.trim_end_matches('/'),
            self.config.routes.login
        );
        let mut body = String::from("Hello,\n\nYour password has been changed.\n");
        if let Some(password) = password {
            body.push_str(&format!("\nYour new password is: {}\n", password));
        }
        body.push_str(&format!(
            "\nYou can log in at {}\n\nRegards,\nYour Application Team",
            login
        ));
        self.deliver(&account.email, "Password changed", &body);
        Ok(())
    }
}
