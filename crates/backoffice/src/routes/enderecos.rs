//! Delivery area route handlers.
//!
//! Each area is a neighbourhood with its delivery fee. Names are unique per
//! company, ignoring case.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use cardapio_core::models::{Endereco, EnderecoInput};
use cardapio_core::{EnderecoId, search};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use super::forms::{optional, parse_price};
use super::{PageContext, SearchQuery, rejection_message};
use crate::error::{AppError, Result};
use crate::middleware::{CspNonce, RequireManager, TenantStaff, push_flash};
use crate::models::Flash;
use crate::state::AppState;

#[derive(Clone, Debug)]
pub struct EnderecoRow {
    pub id: i32,
    pub bairro: String,
    pub taxa_entrega: String,
    pub ativo: bool,
}

impl From<&Endereco> for EnderecoRow {
    fn from(endereco: &Endereco) -> Self {
        Self {
            id: endereco.id.as_i32(),
            bairro: endereco.bairro.clone(),
            taxa_entrega: endereco.taxa_entrega.display(),
            ativo: endereco.ativo,
        }
    }
}

/// Delivery area form values, as typed.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct EnderecoForm {
    #[serde(default)]
    pub bairro: String,
    #[serde(default)]
    pub taxa_entrega: String,
    #[serde(default)]
    pub ativo: Option<String>,
}

impl EnderecoForm {
    #[must_use]
    pub fn ativo(&self) -> bool {
        self.ativo.is_some()
    }

    /// Validate against the areas already registered, skipping `editando`.
    ///
    /// # Errors
    ///
    /// Returns the message to show above the form.
    pub fn parse(
        &self,
        existentes: &[Endereco],
        editando: Option<EnderecoId>,
    ) -> std::result::Result<EnderecoInput, String> {
        let bairro = optional(&self.bairro).ok_or("Preencha o campo bairro.")?;
        let taxa_entrega = parse_price(&self.taxa_entrega, "Taxa de entrega")?;

        let alvo = bairro.to_lowercase();
        let duplicado = existentes
            .iter()
            .any(|e| Some(e.id) != editando && e.bairro.trim().to_lowercase() == alvo);
        if duplicado {
            return Err(format!("O bairro {bairro} já está cadastrado."));
        }

        Ok(EnderecoInput {
            bairro,
            taxa_entrega,
            ativo: self.ativo(),
        })
    }
}

impl From<&Endereco> for EnderecoForm {
    fn from(endereco: &Endereco) -> Self {
        Self {
            bairro: endereco.bairro.clone(),
            taxa_entrega: endereco.taxa_entrega.to_input(),
            ativo: endereco.ativo.then(|| "on".to_string()),
        }
    }
}

#[derive(Template, WebTemplate)]
#[template(path = "enderecos/index.html")]
pub struct EnderecosTemplate {
    pub page: PageContext,
    pub slug: String,
    pub q: String,
    pub enderecos: Vec<EnderecoRow>,
}

#[derive(Template, WebTemplate)]
#[template(path = "enderecos/form.html")]
pub struct EnderecoFormTemplate {
    pub page: PageContext,
    pub slug: String,
    pub action: String,
    pub titulo: &'static str,
    pub form: EnderecoForm,
    pub erro: Option<String>,
}

/// GET /{slug}/enderecos
#[instrument(skip(state, session, nonce, staff), fields(empresa_id = %staff.empresa_id))]
pub async fn index(
    RequireManager(staff): RequireManager,
    State(state): State<AppState>,
    session: Session,
    nonce: CspNonce,
    Query(query): Query<SearchQuery>,
) -> Result<EnderecosTemplate> {
    let enderecos = fetch_enderecos(&state, &staff).await?;

    Ok(EnderecosTemplate {
        page: PageContext::new(nonce, &session, &staff.user, "enderecos").await,
        slug: staff.slug.to_string(),
        enderecos: search::filter(&enderecos, &query.q)
            .into_iter()
            .map(EnderecoRow::from)
            .collect(),
        q: query.q,
    })
}

/// GET /{slug}/enderecos/novo
pub async fn new(
    RequireManager(staff): RequireManager,
    session: Session,
    nonce: CspNonce,
) -> Response {
    let form = EnderecoForm {
        ativo: Some("on".to_string()),
        ..EnderecoForm::default()
    };
    let page = PageContext::new(nonce, &session, &staff.user, "enderecos").await;
    render_form(page, &staff, None, form, None)
}

/// POST /{slug}/enderecos
#[instrument(skip_all, fields(empresa_id = %staff.empresa_id))]
pub async fn create(
    RequireManager(staff): RequireManager,
    State(state): State<AppState>,
    session: Session,
    nonce: CspNonce,
    Form(form): Form<EnderecoForm>,
) -> Result<Response> {
    save(&state, &session, nonce, &staff, None, form).await
}

/// GET /{slug}/enderecos/{id}
#[instrument(skip(state, session, nonce, staff), fields(empresa_id = %staff.empresa_id))]
pub async fn edit(
    RequireManager(staff): RequireManager,
    State(state): State<AppState>,
    session: Session,
    nonce: CspNonce,
    Path((_slug, id)): Path<(String, i32)>,
) -> Result<Response> {
    let id = EnderecoId::new(id);
    let endereco = fetch_enderecos(&state, &staff)
        .await?
        .into_iter()
        .find(|e| e.id == id)
        .ok_or_else(|| AppError::NotFound(format!("bairro {id}")))?;

    let page = PageContext::new(nonce, &session, &staff.user, "enderecos").await;
    Ok(render_form(page, &staff, Some(id), EnderecoForm::from(&endereco), None))
}

/// POST /{slug}/enderecos/{id}
#[instrument(skip_all, fields(empresa_id = %staff.empresa_id, endereco_id = id))]
pub async fn update(
    RequireManager(staff): RequireManager,
    State(state): State<AppState>,
    session: Session,
    nonce: CspNonce,
    Path((_slug, id)): Path<(String, i32)>,
    Form(form): Form<EnderecoForm>,
) -> Result<Response> {
    save(&state, &session, nonce, &staff, Some(EnderecoId::new(id)), form).await
}

/// POST /{slug}/enderecos/{id}/excluir
#[instrument(skip(state, session, staff), fields(empresa_id = %staff.empresa_id))]
pub async fn delete(
    RequireManager(staff): RequireManager,
    State(state): State<AppState>,
    session: Session,
    Path((_slug, id)): Path<(String, i32)>,
) -> Result<Redirect> {
    let id = EnderecoId::new(id);
    let flash = match state.api().excluir_endereco(id, &staff.user.bearer()).await {
        Ok(()) => {
            tracing::info!(endereco_id = %id, "Delivery area deleted");
            Flash::sucesso("Bairro excluído.")
        }
        Err(e) => Flash::erro(rejection_message(e.into())?),
    };

    push_flash(&session, flash).await?;
    Ok(Redirect::to(&list_path(&staff)))
}

/// Create or update, re-rendering the form when refused.
async fn save(
    state: &AppState,
    session: &Session,
    nonce: CspNonce,
    staff: &TenantStaff,
    id: Option<EnderecoId>,
    form: EnderecoForm,
) -> Result<Response> {
    let existentes = fetch_enderecos(state, staff).await?;
    let bearer = staff.user.bearer();

    let erro = match form.parse(&existentes, id) {
        Ok(input) => {
            let result = match id {
                Some(id) => state.api().atualizar_endereco(id, &input, &bearer).await,
                None => state.api().criar_endereco(staff.empresa_id, &input, &bearer).await,
            };
            match result {
                Ok(endereco) => {
                    tracing::info!(endereco_id = %endereco.id, "Delivery area saved");
                    let mensagem = format!("Bairro {} salvo.", endereco.bairro);
                    push_flash(session, Flash::sucesso(mensagem)).await?;
                    return Ok(Redirect::to(&list_path(staff)).into_response());
                }
                Err(e) => rejection_message(e.into())?,
            }
        }
        Err(message) => message,
    };

    let page = PageContext::new(nonce, session, &staff.user, "enderecos").await;
    let response = render_form(page, staff, id, form, Some(erro));
    Ok((StatusCode::UNPROCESSABLE_ENTITY, response).into_response())
}

async fn fetch_enderecos(state: &AppState, staff: &TenantStaff) -> Result<Vec<Endereco>> {
    Ok(state
        .api()
        .listar_enderecos(staff.empresa_id, &staff.user.bearer())
        .await?)
}

fn list_path(staff: &TenantStaff) -> String {
    format!("/{}/enderecos", staff.slug)
}

fn render_form(
    page: PageContext,
    staff: &TenantStaff,
    id: Option<EnderecoId>,
    form: EnderecoForm,
    erro: Option<String>,
) -> Response {
    let (action, titulo) = match id {
        Some(id) => (format!("{}/{id}", list_path(staff)), "Editar bairro"),
        None => (list_path(staff), "Novo bairro"),
    };
    EnderecoFormTemplate {
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
    use cardapio_core::{EmpresaId, Price};

    fn existentes() -> Vec<Endereco> {
        vec![Endereco {
            id: EnderecoId::new(1),
            empresa_id: EmpresaId::new(1),
            bairro: "Centro".to_string(),
            taxa_entrega: Price::from_cents(500),
            ativo: true,
        }]
    }

    fn form(bairro: &str, taxa: &str) -> EnderecoForm {
        EnderecoForm {
            bairro: bairro.to_string(),
            taxa_entrega: taxa.to_string(),
            ativo: None,
        }
    }

    #[test]
    fn test_duplicate_neighbourhood_is_refused() {
        let err = form(" centro ", "6").parse(&existentes(), None).unwrap_err();
        assert_eq!(err, "O bairro centro já está cadastrado.");

        // Editing the same record keeps its name.
        let input = form("Centro", "6,50")
            .parse(&existentes(), Some(EnderecoId::new(1)))
            .unwrap();
        assert_eq!(input.taxa_entrega, Price::from_cents(650));
        assert!(!input.ativo);
    }

    #[test]
    fn test_fee_is_required() {
        let err = form("Jardins", "").parse(&existentes(), None).unwrap_err();
        assert!(err.starts_with("Taxa de entrega: "));
    }
}
