//! BrasilAPI CNPJ lookup used to prefill the company form.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::ApiError;

pub const BRASILAPI_URL: &str = "https://brasilapi.com.br";

/// Registry data for a CNPJ.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CnpjInfo {
    pub cnpj: String,
    pub razao_social: String,
    #[serde(default)]
    pub nome_fantasia: Option<String>,
    #[serde(default, rename = "ddd_telefone_1")]
    pub telefone: Option<String>,
    #[serde(default)]
    pub logradouro: Option<String>,
    #[serde(default)]
    pub numero: Option<String>,
    #[serde(default)]
    pub bairro: Option<String>,
    #[serde(default)]
    pub municipio: Option<String>,
    #[serde(default)]
    pub uf: Option<String>,
}

impl CnpjInfo {
    /// Trade name when registered, otherwise the legal name.
    #[must_use]
    pub fn nome(&self) -> &str {
        self.nome_fantasia
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .unwrap_or(self.razao_social.as_str())
    }

    /// Single-line address, e.g. `Rua A, 10 - Centro, Belo Horizonte/MG`.
    #[must_use]
    pub fn endereco(&self) -> String {
        let mut out = String::new();
        let part = |v: &Option<String>| v.as_deref().map(str::trim).filter(|s| !s.is_empty()).map(str::to_string);
        if let Some(rua) = part(&self.logradouro) {
            out.push_str(&rua);
            if let Some(numero) = part(&self.numero) {
                out.push_str(", ");
                out.push_str(&numero);
            }
        }
        if let Some(bairro) = part(&self.bairro) {
            if !out.is_empty() {
                out.push_str(" - ");
            }
            out.push_str(&bairro);
        }
        if let Some(cidade) = part(&self.municipio) {
            if !out.is_empty() {
                out.push_str(", ");
            }
            out.push_str(&cidade);
            if let Some(uf) = part(&self.uf) {
                out.push('/');
                out.push_str(&uf);
            }
        }
        out
    }
}

/// Strip punctuation from a CNPJ; `None` unless exactly 14 digits remain.
#[must_use]
pub fn normalize_cnpj(raw: &str) -> Option<String> {
    let digits: String = raw.chars().filter(char::is_ascii_digit).collect();
    (digits.len() == 14 && raw.chars().all(|c| c.is_ascii_digit() || ".-/ ".contains(c)))
        .then_some(digits)
}

/// BrasilAPI client.
#[derive(Clone, Debug)]
pub struct CnpjClient {
    inner: Arc<CnpjInner>,
}

#[derive(Debug)]
struct CnpjInner {
    client: reqwest::Client,
    base_url: String,
}

impl CnpjClient {
    /// # Errors
    ///
    /// Returns error if the HTTP client fails to build.
    pub fn new() -> Result<Self, ApiError> {
        Self::with_base_url(BRASILAPI_URL)
    }

    /// # Errors
    ///
    /// Returns error if the HTTP client fails to build.
    pub fn with_base_url(base_url: &str) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self {
            inner: Arc::new(CnpjInner {
                client,
                base_url: base_url.trim_end_matches('/').to_string(),
            }),
        })
    }

    /// Look up a CNPJ. Punctuation is accepted.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::NotFound`] for malformed or unknown numbers.
    #[instrument(skip(self))]
    pub async fn consultar(&self, cnpj: &str) -> Result<CnpjInfo, ApiError> {
        let digits =
            normalize_cnpj(cnpj).ok_or_else(|| ApiError::NotFound("CNPJ inválido".to_string()))?;
        let response = self
            .inner
            .client
            .get(format!("{}/api/cnpj/v1/{digits}", self.inner.base_url))
            .send()
            .await?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND || status == reqwest::StatusCode::BAD_REQUEST {
            return Err(ApiError::NotFound("CNPJ não encontrado".to_string()));
        }
        if !status.is_success() {
            return Err(ApiError::Api {
                status: status.as_u16(),
                message: String::new(),
            });
        }

        response
            .json()
            .await
            .map_err(|e| ApiError::Parse(format!("Failed to parse CNPJ response: {e}")))
    }
}
