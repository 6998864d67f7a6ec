//! Menu notice route handlers.
//!
//! Active notices are shown at the top of the public menu.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use cardapio_core::models::{Aviso, AvisoInput};
use cardapio_core::{AvisoId, search};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use super::forms::optional;
use super::{PageContext, SearchQuery, rejection_message};
use crate::error::{AppError, Result};
use crate::middleware::{CspNonce, RequireManager, TenantStaff, push_flash};
use crate::models::Flash;
use crate::state::AppState;

/// Longest notice title that fits the menu banner.
pub const TITULO_MAX: usize = 80;

#[derive(Clone, Debug)]
pub struct AvisoRow {
    pub id: i32,
    pub titulo: String,
    pub mensagem: String,
    pub ativo: bool,
}

impl From<&Aviso> for AvisoRow {
    fn from(aviso: &Aviso) -> Self {
        Self {
            id: aviso.id.as_i32(),
            titulo: aviso.titulo.clone(),
            mensagem: aviso.mensagem.clone(),
            ativo: aviso.ativo,
        }
    }
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct AvisoForm {
    #[serde(default)]
    pub titulo: String,
    #[serde(default)]
    pub mensagem: String,
    #[serde(default)]
    pub ativo: Option<String>,
}

impl AvisoForm {
    #[must_use]
    pub fn ativo(&self) -> bool {
        self.ativo.is_some()
    }

    /// # Errors
    ///
    /// Returns the message to show above the form.
    pub fn parse(&self) -> std::result::Result<AvisoInput, String> {
        let titulo = optional(&self.titulo).ok_or("Preencha o campo título.")?;
        if titulo.chars().count() > TITULO_MAX {
            return Err(format!("O título deve ter no máximo {TITULO_MAX} caracteres."));
        }
        Ok(AvisoInput {
            titulo,
            mensagem: self.mensagem.trim().to_string(),
            ativo: self.ativo(),
        })
    }
}

impl From<&Aviso> for AvisoForm {
    fn from(aviso: &Aviso) -> Self {
        Self {
            titulo: aviso.titulo.clone(),
            mensagem: aviso.mensagem.clone(),
            ativo: aviso.ativo.then(|| "on".to_string()),
        }
    }
}

#[derive(Template, WebTemplate)]
#[template(path = "avisos/index.html")]
pub struct AvisosTemplate {
    pub page: PageContext,
    pub slug: String,
    pub q: String,
    pub avisos: Vec<AvisoRow>,
}

#[derive(Template, WebTemplate)]
#[template(path = "avisos/form.html")]
pub struct AvisoFormTemplate {
    pub page: PageContext,
    pub slug: String,
    pub action: String,
    pub titulo: &'static str,
    pub form: AvisoForm,
    pub erro: Option<String>,
}

/// GET /{slug}/avisos
#[instrument(skip(state, session, nonce, staff), fields(empresa_id = %staff.empresa_id))]
pub async fn index(
    RequireManager(staff): RequireManager,
    State(state): State<AppState>,
    session: Session,
    nonce: CspNonce,
    Query(query): Query<SearchQuery>,
) -> Result<AvisosTemplate> {
    let avisos = fetch_avisos(&state, &staff).await?;

    Ok(AvisosTemplate {
        page: PageContext::new(nonce, &session, &staff.user, "avisos").await,
        slug: staff.slug.to_string(),
        avisos: search::filter(&avisos, &query.q)
            .into_iter()
            .map(AvisoRow::from)
            .collect(),
        q: query.q,
    })
}

/// GET /{slug}/avisos/novo
pub async fn new(
    RequireManager(staff): RequireManager,
    session: Session,
    nonce: CspNonce,
) -> Response {
    let form = AvisoForm {
        ativo: Some("on".to_string()),
        ..AvisoForm::default()
    };
    let page = PageContext::new(nonce, &session, &staff.user, "avisos").await;
    render_form(page, &staff, None, form, None)
}

/// POST /{slug}/avisos
#[instrument(skip_all, fields(empresa_id = %staff.empresa_id))]
pub async fn create(
    RequireManager(staff): RequireManager,
    State(state): State<AppState>,
    session: Session,
    nonce: CspNonce,
    Form(form): Form<AvisoForm>,
) -> Result<Response> {
    save(&state, &session, nonce, &staff, None, form).await
}

/// GET /{slug}/avisos/{id}
#[instrument(skip(state, session, nonce, staff), fields(empresa_id = %staff.empresa_id))]
pub async fn edit(
    RequireManager(staff): RequireManager,
    State(state): State<AppState>,
    session: Session,
    nonce: CspNonce,
    Path((_slug, id)): Path<(String, i32)>,
) -> Result<Response> {
    let id = AvisoId::new(id);
    let aviso = fetch_avisos(&state, &staff)
        .await?
        .into_iter()
        .find(|a| a.id == id)
        .ok_or_else(|| AppError::NotFound(format!("aviso {id}")))?;

    let page = PageContext::new(nonce, &session, &staff.user, "avisos").await;
    Ok(render_form(page, &staff, Some(id), AvisoForm::from(&aviso), None))
}

/// POST /{slug}/avisos/{id}
#[instrument(skip_all, fields(empresa_id = %staff.empresa_id, aviso_id = id))]
pub async fn update(
    RequireManager(staff): RequireManager,
    State(state): State<AppState>,
    session: Session,
    nonce: CspNonce,
    Path((_slug, id)): Path<(String, i32)>,
    Form(form): Form<AvisoForm>,
) -> Result<Response> {
    save(&state, &session, nonce, &staff, Some(AvisoId::new(id)), form).await
}

/// POST /{slug}/avisos/{id}/excluir
#[instrument(skip(state, session, staff), fields(empresa_id = %staff.empresa_id))]
pub async fn delete(
    RequireManager(staff): RequireManager,
    State(state): State<AppState>,
    session: Session,
    Path((_slug, id)): Path<(String, i32)>,
) -> Result<Redirect> {
    let id = AvisoId::new(id);
    let flash = match state.api().excluir_aviso(id, &staff.user.bearer()).await {
        Ok(()) => Flash::sucesso("Aviso excluído."),
        Err(e) => Flash::erro(rejection_message(e.into())?),
    };

    push_flash(&session, flash).await?;
    Ok(Redirect::to(&list_path(&staff)))
}

async fn save(
    state: &AppState,
    session: &Session,
    nonce: CspNonce,
    staff: &TenantStaff,
    id: Option<AvisoId>,
    form: AvisoForm,
) -> Result<Response> {
    let bearer = staff.user.bearer();

    let erro = match form.parse() {
        Ok(input) => {
            let result = match id {
                Some(id) => state.api().atualizar_aviso(id, &input, &bearer).await,
                None => state.api().criar_aviso(staff.empresa_id, &input, &bearer).await,
            };
            match result {
                Ok(aviso) => {
                    tracing::info!(aviso_id = %aviso.id, ativo = aviso.ativo, "Notice saved");
                    push_flash(session, Flash::sucesso("Aviso salvo.")).await?;
                    return Ok(Redirect::to(&list_path(staff)).into_response());
                }
                Err(e) => rejection_message(e.into())?,
            }
        }
        Err(message) => message,
    };

    let page = PageContext::new(nonce, session, &staff.user, "avisos").await;
    let response = render_form(page, staff, id, form, Some(erro));
    Ok((StatusCode::UNPROCESSABLE_ENTITY, response).into_response())
}

async fn fetch_avisos(state: &AppState, staff: &TenantStaff) -> Result<Vec<Aviso>> {
    Ok(state
        .api()
        .listar_avisos(staff.empresa_id, &staff.user.bearer())
        .await?)
}

fn list_path(staff: &TenantStaff) -> String {
    format!("/{}/avisos", staff.slug)
}

fn render_form(
    page: PageContext,
    staff: &TenantStaff,
    id: Option<AvisoId>,
    form: AvisoForm,
    erro: Option<String>,
) -> Response {
    let (action, titulo) = match id {
        Some(id) => (format!("{}/{id}", list_path(staff)), "Editar aviso"),
        None => (list_path(staff), "Novo aviso"),
    };
    AvisoFormTemplate {
        page,
        slug: staff.slug.to_string(),
        action,
        titulo,
        form,
        erro,
    }
    .into_response()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_notice_form_validation() {
        let form = AvisoForm {
            titulo: "  Fechados no feriado ".to_string(),
            mensagem: " Voltamos na quinta. ".to_string(),
            ativo: Some("on".to_string()),
        };
        let input = form.parse().unwrap();
        assert_eq!(input.titulo, "Fechados no feriado");
        assert_eq!(input.mensagem, "Voltamos na quinta.");
        assert!(input.ativo);

        let longo = AvisoForm {
            titulo: "a".repeat(TITULO_MAX + 1),
            ..AvisoForm::default()
        };
        assert!(longo.parse().is_err());
        assert_eq!(AvisoForm::default().parse().unwrap_err(), "Preencha o campo título.");
    }
}
