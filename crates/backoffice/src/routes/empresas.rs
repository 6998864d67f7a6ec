//! Company provisioning route handlers (super admin only).
//!
//! A company is created together with its owner account. The registry
//! lookup fills name, phone and address from a CNPJ while the form is
//! being typed.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use cardapio_client::ApiError;
use cardapio_client::external::{CnpjInfo, normalize_cnpj};
use cardapio_core::models::{Empresa, EmpresaInput, NovoAdmin};
use cardapio_core::types::SlugError;
use cardapio_core::{Email, EmpresaId, Slug, search};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use super::forms::optional;
use super::funcionarios::SENHA_MIN;
use super::{PageContext, SearchQuery, rejection_message};
use crate::error::{AppError, Result};
use crate::middleware::{CspNonce, RequireSuperAdmin, push_flash};
use crate::models::{CurrentUser, Flash};
use crate::state::AppState;

const LIST_PATH: &str = "/admin/empresas";

fn slug_message(err: &SlugError) -> String {
    match err {
        SlugError::Empty => "Preencha o endereço do cardápio.".to_string(),
        SlugError::TooLong { max } => {
            format!("O endereço do cardápio deve ter no máximo {max} caracteres.")
        }
        SlugError::InvalidChar(c) => format!(
            "O endereço do cardápio aceita só letras minúsculas, números e hífen (encontrado '{c}')."
        ),
        SlugError::EdgeHyphen => {
            "O endereço do cardápio não pode começar nem terminar com hífen.".to_string()
        }
        SlugError::Reserved(slug) => format!("O endereço '{slug}' é reservado."),
    }
}

// =============================================================================
// Views
// =============================================================================

#[derive(Clone, Debug)]
pub struct EmpresaRow {
    pub id: i32,
    pub nome: String,
    pub slug: String,
    pub cnpj: String,
    pub ativo: bool,
    pub online: bool,
}

impl From<&Empresa> for EmpresaRow {
    fn from(empresa: &Empresa) -> Self {
        Self {
            id: empresa.id.as_i32(),
            nome: empresa.nome.clone(),
            slug: empresa.slug.to_string(),
            cnpj: empresa.cnpj.clone().unwrap_or_default(),
            ativo: empresa.ativo,
            online: empresa.permitir_pedidos_online,
        }
    }
}

/// Registry-backed fields, re-rendered on their own by the CNPJ lookup.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct CamposEmpresa {
    #[serde(default)]
    pub cnpj: String,
    #[serde(default)]
    pub nome: String,
    #[serde(default)]
    pub telefone: String,
    #[serde(default)]
    pub endereco: String,
    /// Lookup outcome shown under the CNPJ input.
    #[serde(skip)]
    pub aviso: Option<String>,
}

impl CamposEmpresa {
    /// Overwrite with registry data, keeping typed values the registry lacks.
    fn preencher(&mut self, info: &CnpjInfo) {
        self.cnpj.clone_from(&info.cnpj);
        self.nome = info.nome().to_string();
        if let Some(telefone) = info.telefone.as_deref().and_then(optional) {
            self.telefone = telefone;
        }
        let endereco = info.endereco();
        if !endereco.is_empty() {
            self.endereco = endereco;
        }
        self.aviso = Some("Dados preenchidos a partir do CNPJ.".to_string());
    }
}

/// Company form values, as typed. The owner fields matter only on creation.
#[derive(Clone, Default, Deserialize)]
pub struct EmpresaForm {
    #[serde(default)]
    pub slug: String,
    #[serde(flatten)]
    pub campos: CamposEmpresa,
    #[serde(default)]
    pub logo_url: String,
    #[serde(default)]
    pub ativo: Option<String>,
    #[serde(default)]
    pub admin_nome: String,
    #[serde(default)]
    pub admin_email: String,
    #[serde(default)]
    admin_senha: String,
}

impl std::fmt::Debug for EmpresaForm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmpresaForm")
            .field("slug", &self.slug)
            .field("campos", &self.campos)
            .field("admin_email", &self.admin_email)
            .field("admin_senha", &"[REDACTED]")
            .finish_non_exhaustive()
    }
}

impl EmpresaForm {
    #[must_use]
    pub fn nova() -> Self {
        Self {
            ativo: Some("on".to_string()),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn ativo(&self) -> bool {
        self.ativo.is_some()
    }

    /// Validate into the backend payload. The owner account is required
    /// when `criando` and never sent otherwise.
    ///
    /// # Errors
    ///
    /// Returns the message to show above the form.
    pub fn parse(&self, criando: bool) -> std::result::Result<EmpresaInput, String> {
        let slug = Slug::parse(self.slug.trim()).map_err(|e| slug_message(&e))?;
        let nome = optional(&self.campos.nome).ok_or("Preencha o campo nome.")?;
        let cnpj = match optional(&self.campos.cnpj) {
            Some(raw) => Some(normalize_cnpj(&raw).ok_or("CNPJ inválido: informe os 14 dígitos.")?),
            None => None,
        };
        let logo_url = optional(&self.logo_url);
        if logo_url
            .as_deref()
            .is_some_and(|url| !(url.starts_with("https://") || url.starts_with("http://")))
        {
            return Err("O logo deve ser um endereço http(s).".to_string());
        }

        let admin = if criando {
            let nome = optional(&self.admin_nome).ok_or("Preencha o nome do responsável.")?;
            let email = Email::parse(&self.admin_email).map_err(|e| e.to_string())?;
            let senha = self.admin_senha.trim();
            if senha.chars().count() < SENHA_MIN {
                return Err(format!(
                    "A senha do responsável deve ter pelo menos {SENHA_MIN} caracteres."
                ));
            }
            Some(NovoAdmin {
                nome,
                email: email.to_string(),
                senha: senha.to_string(),
            })
        } else {
            None
        };

        Ok(EmpresaInput {
            slug: slug.to_string(),
            nome,
            cnpj,
            telefone: optional(&self.campos.telefone),
            endereco: optional(&self.campos.endereco),
            logo_url,
            ativo: self.ativo(),
            admin,
        })
    }

    fn without_password(self) -> Self {
        Self {
            admin_senha: String::new(),
            ..self
        }
    }
}

impl From<&Empresa> for EmpresaForm {
    fn from(empresa: &Empresa) -> Self {
        Self {
            slug: empresa.slug.to_string(),
            campos: CamposEmpresa {
                cnpj: empresa.cnpj.clone().unwrap_or_default(),
                nome: empresa.nome.clone(),
                telefone: empresa.telefone.clone().unwrap_or_default(),
                endereco: empresa.endereco.clone().unwrap_or_default(),
                aviso: None,
            },
            logo_url: empresa.logo_url.clone().unwrap_or_default(),
            ativo: empresa.ativo.then(|| "on".to_string()),
            ..Self::default()
        }
    }
}

// =============================================================================
// Templates
// =============================================================================

#[derive(Template, WebTemplate)]
#[template(path = "empresas/index.html")]
pub struct EmpresasTemplate {
    pub page: PageContext,
    pub q: String,
    pub empresas: Vec<EmpresaRow>,
}

#[derive(Template, WebTemplate)]
#[template(path = "empresas/form.html")]
pub struct EmpresaFormTemplate {
    pub page: PageContext,
    pub action: String,
    pub titulo: &'static str,
    pub criando: bool,
    pub form: EmpresaForm,
    pub campos: CamposEmpresa,
    pub erro: Option<String>,
}

/// The registry-backed fieldset alone, swapped in by the CNPJ lookup.
#[derive(Template, WebTemplate)]
#[template(path = "partials/empresa_fields.html")]
pub struct CamposEmpresaTemplate {
    pub campos: CamposEmpresa,
}

// =============================================================================
// Handlers
// =============================================================================

/// GET /admin/empresas
#[instrument(skip(state, session, nonce, user))]
pub async fn index(
    RequireSuperAdmin(user): RequireSuperAdmin,
    State(state): State<AppState>,
    session: Session,
    nonce: CspNonce,
    Query(query): Query<SearchQuery>,
) -> Result<EmpresasTemplate> {
    let empresas = state.api().listar_empresas(&user.bearer()).await?;

    Ok(EmpresasTemplate {
        page: PageContext::new(nonce, &session, &user, "empresas").await,
        empresas: search::filter(&empresas, &query.q)
            .into_iter()
            .map(EmpresaRow::from)
            .collect(),
        q: query.q,
    })
}

/// GET /admin/empresas/nova
pub async fn new(
    RequireSuperAdmin(user): RequireSuperAdmin,
    session: Session,
    nonce: CspNonce,
) -> Response {
    let page = PageContext::new(nonce, &session, &user, "empresas").await;
    render_form(page, None, EmpresaForm::nova(), None)
}

/// POST /admin/empresas
#[instrument(skip_all)]
pub async fn create(
    RequireSuperAdmin(user): RequireSuperAdmin,
    State(state): State<AppState>,
    session: Session,
    nonce: CspNonce,
    Form(form): Form<EmpresaForm>,
) -> Result<Response> {
    let erro = match form.parse(true) {
        Ok(input) => match state.api().criar_empresa(&input, &user.bearer()).await {
            Ok(empresa) => {
                tracing::info!(empresa_id = %empresa.id, slug = %empresa.slug, "Company created");
                let mensagem = format!(
                    "Empresa {} criada. O responsável já pode entrar com {}.",
                    empresa.nome, form.admin_email.trim()
                );
                push_flash(&session, Flash::sucesso(mensagem)).await?;
                return Ok(Redirect::to(LIST_PATH).into_response());
            }
            Err(e) => rejection_message(e.into())?,
        },
        Err(message) => message,
    };

    rejected(&session, nonce, &user, None, form, erro).await
}

/// GET /admin/empresas/{id}
#[instrument(skip(state, session, nonce, user))]
pub async fn edit(
    RequireSuperAdmin(user): RequireSuperAdmin,
    State(state): State<AppState>,
    session: Session,
    nonce: CspNonce,
    Path(id): Path<i32>,
) -> Result<Response> {
    let id = EmpresaId::new(id);
    let empresa = state
        .api()
        .listar_empresas(&user.bearer())
        .await?
        .into_iter()
        .find(|e| e.id == id)
        .ok_or_else(|| AppError::NotFound(format!("empresa {id}")))?;

    let page = PageContext::new(nonce, &session, &user, "empresas").await;
    Ok(render_form(page, Some(id), EmpresaForm::from(&empresa), None))
}

/// POST /admin/empresas/{id}
#[instrument(skip_all, fields(empresa_id = id))]
pub async fn update(
    RequireSuperAdmin(user): RequireSuperAdmin,
    State(state): State<AppState>,
    session: Session,
    nonce: CspNonce,
    Path(id): Path<i32>,
    Form(form): Form<EmpresaForm>,
) -> Result<Response> {
    let id = EmpresaId::new(id);
    let erro = match form.parse(false) {
        Ok(input) => match state.api().atualizar_empresa(id, &input, &user.bearer()).await {
            Ok(empresa) => {
                tracing::info!(empresa_id = %empresa.id, ativo = empresa.ativo, "Company updated");
                push_flash(&session, Flash::sucesso(format!("Empresa {} salva.", empresa.nome)))
                    .await?;
                return Ok(Redirect::to(LIST_PATH).into_response());
            }
            Err(e) => rejection_message(e.into())?,
        },
        Err(message) => message,
    };

    rejected(&session, nonce, &user, Some(id), form, erro).await
}

/// POST /admin/empresas/{id}/excluir
#[instrument(skip(state, session, user))]
pub async fn delete(
    RequireSuperAdmin(user): RequireSuperAdmin,
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<i32>,
) -> Result<Redirect> {
    let id = EmpresaId::new(id);
    let flash = match state.api().excluir_empresa(id, &user.bearer()).await {
        Ok(()) => {
            tracing::info!(empresa_id = %id, "Company deleted");
            Flash::sucesso("Empresa excluída.")
        }
        Err(e) => Flash::erro(rejection_message(e.into())?),
    };

    push_flash(&session, flash).await?;
    Ok(Redirect::to(LIST_PATH))
}

/// Fill the registry-backed fields from the typed CNPJ.
///
/// Always answers with the fieldset so the swap happens; failures keep the
/// typed values and explain themselves under the CNPJ input.
///
/// GET /admin/cnpj
#[instrument(skip_all, fields(cnpj = %campos.cnpj))]
pub async fn cnpj_lookup(
    RequireSuperAdmin(_user): RequireSuperAdmin,
    State(state): State<AppState>,
    Query(mut campos): Query<CamposEmpresa>,
) -> CamposEmpresaTemplate {
    match normalize_cnpj(&campos.cnpj) {
        None if campos.cnpj.trim().is_empty() => {}
        None => campos.aviso = Some("CNPJ inválido: informe os 14 dígitos.".to_string()),
        Some(digits) => match state.cnpj().consultar(&digits).await {
            Ok(info) => campos.preencher(&info),
            Err(ApiError::NotFound(_)) => {
                campos.aviso = Some("CNPJ não encontrado na Receita.".to_string());
            }
            Err(e) => {
                tracing::warn!(error = %e, "CNPJ lookup failed");
                campos.aviso =
                    Some("Consulta de CNPJ indisponível agora. Preencha os dados à mão.".to_string());
            }
        },
    }

    CamposEmpresaTemplate { campos }
}

// =============================================================================
// Helpers
// =============================================================================

async fn rejected(
    session: &Session,
    nonce: CspNonce,
    user: &CurrentUser,
    id: Option<EmpresaId>,
    form: EmpresaForm,
    erro: String,
) -> Result<Response> {
    let page = PageContext::new(nonce, session, user, "empresas").await;
    let response = render_form(page, id, form.without_password(), Some(erro));
    Ok((StatusCode::UNPROCESSABLE_ENTITY, response).into_response())
}

fn render_form(
    page: PageContext,
    id: Option<EmpresaId>,
    form: EmpresaForm,
    erro: Option<String>,
) -> Response {
    let (action, titulo) = match id {
        Some(id) => (format!("{LIST_PATH}/{id}"), "Editar empresa"),
        None => (LIST_PATH.to_string(), "Nova empresa"),
    };
    EmpresaFormTemplate {
        page,
        action,
        titulo,
        criando: id.is_none(),
        campos: form.campos.clone(),
        form,
        erro,
    }
    .into_response()
}
