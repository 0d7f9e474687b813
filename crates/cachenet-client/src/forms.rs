//! Multipart forms for server provisioning and application creation.
//!
//! Forms are validated locally before they are turned into a
//! `multipart/form-data` body; a form that fails validation never reaches
//! the network.

use std::net::IpAddr;

use reqwest::multipart::{Form, Part};

use cachenet_topology::{AuthType, ServerRef};

use crate::error::FormError;

// ── Servers ───────────────────────────────────────────────────────

/// SSH credentials for a server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerAuth {
    Password(String),
    PrivateKey {
        key: String,
        passphrase: Option<String>,
    },
}

impl ServerAuth {
    pub fn auth_type(&self) -> AuthType {
        match self {
            Self::Password(_) => AuthType::Password,
            Self::PrivateKey { .. } => AuthType::Key,
        }
    }
}

/// Fields of the create/update server form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerForm {
    pub name: String,
    pub ip: String,
    pub username: String,
    pub ssh_port: u16,
    pub grpc_port: u16,
    pub auth: ServerAuth,
}

impl ServerForm {
    pub fn validate(&self) -> Result<(), FormError> {
        if self.name.trim().is_empty() {
            return Err(FormError::Required("name"));
        }
        if self.ip.trim().is_empty() {
            return Err(FormError::Required("ip"));
        }
        if !is_valid_address(self.ip.trim()) {
            return Err(FormError::InvalidAddress(self.ip.clone()));
        }
        if self.username.trim().is_empty() {
            return Err(FormError::Required("username"));
        }
        if self.ssh_port == 0 {
            return Err(FormError::InvalidPort("ssh_port"));
        }
        if self.grpc_port == 0 {
            return Err(FormError::InvalidPort("grpc_port"));
        }
        match &self.auth {
            ServerAuth::Password(p) if p.is_empty() => Err(FormError::Required("password")),
            ServerAuth::PrivateKey { key, .. } if key.trim().is_empty() => {
                Err(FormError::Required("privateKey"))
            }
            _ => Ok(()),
        }
    }

    /// Multipart body; `server` is set for updates.
    pub fn to_multipart(&self, server: Option<&ServerRef>) -> Form {
        let auth_type = match self.auth.auth_type() {
            AuthType::Password => "password",
            AuthType::Key => "key",
        };
        let mut form = Form::new()
            .text("ip", self.ip.trim().to_string())
            .text("username", self.username.clone())
            .text("ssh_port", self.ssh_port.to_string())
            .text("grpc_port", self.grpc_port.to_string())
            .text("name", self.name.clone())
            .text("auth_type", auth_type);

        form = match &self.auth {
            ServerAuth::Password(password) => form.text("password", password.clone()),
            ServerAuth::PrivateKey { key, passphrase } => {
                let form = form.text("privateKey", key.clone());
                match passphrase {
                    Some(p) => form.text("passphrase", p.clone()),
                    None => form,
                }
            }
        };

        if let Some(server) = server {
            form = form.text("server_uuid", server.as_str().to_string());
        }
        form
    }
}

/// An IP address, or a hostname made of letters, digits, `-` and `.`.
fn is_valid_address(s: &str) -> bool {
    if s.parse::<IpAddr>().is_ok() {
        return true;
    }
    !s.starts_with(['-', '.'])
        && s.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '.')
}

// ── Applications ──────────────────────────────────────────────────

/// Fields of the create application form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplicationForm {
    pub application_name: String,
    pub schema_file_name: String,
    pub schema: Vec<u8>,
    pub master_password: String,
    pub master_password_confirmation: String,
    /// Client lease time in seconds.
    pub client_lease_time: u64,
    /// Extra time servers hold a lease beyond the client lease, in seconds.
    pub server_additional_time: u64,
}

impl ApplicationForm {
    /// Validate the form; names must start with `name_prefix`.
    pub fn validate(&self, name_prefix: &str) -> Result<(), FormError> {
        let name = self.application_name.trim();
        if name.is_empty() {
            return Err(FormError::Required("application_name"));
        }
        if !name.starts_with(name_prefix) || name.len() == name_prefix.len() {
            return Err(FormError::NamePrefix(name_prefix.to_string()));
        }
        if self.schema.is_empty() {
            return Err(FormError::Required("applicationSchema"));
        }
        if self.master_password.is_empty() {
            return Err(FormError::Required("master_password"));
        }
        if self.master_password != self.master_password_confirmation {
            return Err(FormError::PasswordMismatch);
        }
        if self.client_lease_time == 0 {
            return Err(FormError::NotPositive("client_lease_time"));
        }
        if self.server_additional_time == 0 {
            return Err(FormError::NotPositive("server_additional_time"));
        }
        Ok(())
    }

    pub fn to_multipart(&self) -> Form {
        let schema = Part::bytes(self.schema.clone()).file_name(self.schema_file_name.clone());
        Form::new()
            .text("application_name", self.application_name.trim().to_string())
            .part("applicationSchema", schema)
            .text("master_password", self.master_password.clone())
            .text(
                "master_password_confirmation",
                self.master_password_confirmation.clone(),
            )
            .text("client_lease_time", self.client_lease_time.to_string())
            .text("server_additional_time", self.server_additional_time.to_string())
    }
}
