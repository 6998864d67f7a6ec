//! Company settings route handlers.
//!
//! Ordering flags, default delivery fee and opening hours. Hours are typed
//! in the compact schedule syntax and validated before anything is sent.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use cardapio_core::models::{ConfiguracoesEmpresa, Empresa};
use cardapio_core::{OrderGate, Schedule};
use chrono::Utc;
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use super::forms::parse_price;
use super::{PageContext, rejection_message};
use crate::error::Result;
use crate::middleware::{CspNonce, RequireManager, TenantStaff, push_flash};
use crate::models::Flash;
use crate::state::AppState;

/// Settings form values, as typed. Checkboxes are present only when ticked.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct ConfiguracoesForm {
    #[serde(default)]
    pub permitir_pedidos_online: Option<String>,
    #[serde(default)]
    pub desativar_entrega: Option<String>,
    #[serde(default)]
    pub desativar_retirada: Option<String>,
    #[serde(default)]
    pub taxa_entrega_padrao: String,
    #[serde(default)]
    pub horarios: String,
}

fn marcado(flag: bool) -> Option<String> {
    flag.then(|| "on".to_string())
}

impl ConfiguracoesForm {
    #[must_use]
    pub const fn permitir_pedidos_online(&self) -> bool {
        self.permitir_pedidos_online.is_some()
    }

    #[must_use]
    pub const fn desativar_entrega(&self) -> bool {
        self.desativar_entrega.is_some()
    }

    #[must_use]
    pub const fn desativar_retirada(&self) -> bool {
        self.desativar_retirada.is_some()
    }

    /// # Errors
    ///
    /// Returns the message to show above the form.
    pub fn parse(&self) -> std::result::Result<ConfiguracoesEmpresa, String> {
        let taxa_entrega_padrao = match self.taxa_entrega_padrao.trim() {
            "" => cardapio_core::Price::ZERO,
            raw => parse_price(raw, "Taxa de entrega padrão")?,
        };
        let horarios = self
            .horarios
            .parse::<Schedule>()
            .map_err(|e| format!("Horários: {e}"))?;

        Ok(ConfiguracoesEmpresa {
            permitir_pedidos_online: self.permitir_pedidos_online(),
            desativar_entrega: self.desativar_entrega(),
            desativar_retirada: self.desativar_retirada(),
            taxa_entrega_padrao,
            horarios,
        })
    }
}

impl From<&Empresa> for ConfiguracoesForm {
    fn from(empresa: &Empresa) -> Self {
        Self {
            permitir_pedidos_online: marcado(empresa.permitir_pedidos_online),
            desativar_entrega: marcado(empresa.desativar_entrega),
            desativar_retirada: marcado(empresa.desativar_retirada),
            taxa_entrega_padrao: empresa.taxa_entrega_padrao.to_input(),
            horarios: empresa.horarios.to_text(),
        }
    }
}

#[derive(Template, WebTemplate)]
#[template(path = "configuracoes/show.html")]
pub struct ConfiguracoesTemplate {
    pub page: PageContext,
    pub slug: String,
    pub empresa_nome: String,
    /// What the public menu shows right now.
    pub situacao: &'static str,
    pub form: ConfiguracoesForm,
    pub erro: Option<String>,
}

/// Current ordering situation of the menu, in staff words.
#[must_use]
pub fn situacao(gate: &OrderGate) -> &'static str {
    gate.motivo.unwrap_or("Cardápio aberto para pedidos.")
}

/// GET /{slug}/configuracoes
#[instrument(skip(state, session, nonce, staff), fields(empresa_id = %staff.empresa_id))]
pub async fn show(
    RequireManager(staff): RequireManager,
    State(state): State<AppState>,
    session: Session,
    nonce: CspNonce,
) -> Result<ConfiguracoesTemplate> {
    let empresa = state.api().empresa_por_slug(staff.slug.as_str()).await?;
    let gate = OrderGate::at(&empresa, Utc::now(), state.config().utc_offset);

    Ok(ConfiguracoesTemplate {
        page: PageContext::new(nonce, &session, &staff.user, "configuracoes").await,
        slug: staff.slug.to_string(),
        empresa_nome: empresa.nome.clone(),
        situacao: situacao(&gate),
        form: ConfiguracoesForm::from(&empresa),
        erro: None,
    })
}

/// POST /{slug}/configuracoes
#[instrument(skip_all, fields(empresa_id = %staff.empresa_id))]
pub async fn save(
    RequireManager(staff): RequireManager,
    State(state): State<AppState>,
    session: Session,
    nonce: CspNonce,
    Form(form): Form<ConfiguracoesForm>,
) -> Result<Response> {
    let erro = match form.parse() {
        Ok(config) => match state
            .api()
            .salvar_configuracoes(
                staff.empresa_id,
                staff.slug.as_str(),
                &config,
                &staff.user.bearer(),
            )
            .await
        {
            Ok(empresa) => {
                tracing::info!(
                    online = empresa.permitir_pedidos_online,
                    regras = empresa.horarios.rules().len(),
                    "Company settings saved"
                );
                push_flash(&session, Flash::sucesso("Configurações salvas.")).await?;
                return Ok(Redirect::to(&format!("/{}/configuracoes", staff.slug)).into_response());
            }
            Err(e) => rejection_message(e.into())?,
        },
        Err(message) => message,
    };

    rejected(&state, &session, nonce, &staff, form, erro).await
}

async fn rejected(
    state: &AppState,
    session: &Session,
    nonce: CspNonce,
    staff: &TenantStaff,
    form: ConfiguracoesForm,
    erro: String,
) -> Result<Response> {
    let empresa = state.api().empresa_por_slug(staff.slug.as_str()).await?;
    let gate = OrderGate::at(&empresa, Utc::now(), state.config().utc_offset);

    let template = ConfiguracoesTemplate {
        page: PageContext::new(nonce, session, &staff.user, "configuracoes").await,
        slug: staff.slug.to_string(),
        empresa_nome: empresa.nome,
        situacao: situacao(&gate),
        form,
        erro: Some(erro),
    };
    Ok((StatusCode::UNPROCESSABLE_ENTITY, template).into_response())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use cardapio_core::Price;

    #[test]
    fn test_settings_form_parses_flags_and_hours() {
        let form = ConfiguracoesForm {
            permitir_pedidos_online: Some("on".to_string()),
            desativar_entrega: None,
            desativar_retirada: Some("on".to_string()),
            taxa_entrega_padrao: "7,00".to_string(),
            horarios: "seg-sex 18:00-23:30; sab,dom 18:00-01:00".to_string(),
        };
        let config = form.parse().unwrap();
        assert!(config.permitir_pedidos_online);
        assert!(!config.desativar_entrega && config.desativar_retirada);
        assert_eq!(config.taxa_entrega_padrao, Price::from_cents(700));
        assert_eq!(config.horarios.rules().len(), 2);
    }

    #[test]
    fn test_bad_hours_are_reported() {
        let form = ConfiguracoesForm {
            horarios: "seg 25:00-26:00".to_string(),
            ..ConfiguracoesForm::default()
        };
        assert!(form.parse().unwrap_err().starts_with("Horários: "));
    }

    #[test]
    fn test_blank_fee_and_hours_mean_zero_and_closed() {
        let config = ConfiguracoesForm::default().parse().unwrap();
        assert_eq!(config.taxa_entrega_padrao, Price::ZERO);
        assert!(config.horarios.is_empty());
        assert!(!config.permitir_pedidos_online);
    }
}
