//! Employee route handlers.
//!
//! Admins may grant any tenant role; managers may only create managers and
//! employees. A password is required when creating an account and optional
//! when editing one (blank keeps the current password).

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use cardapio_core::models::{Funcionario, FuncionarioInput};
use cardapio_core::{Email, FuncionarioId, UserRole, search};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use super::forms::optional;
use super::{PageContext, SearchQuery, rejection_message};
use crate::error::{AppError, Result};
use crate::middleware::{CspNonce, RequireManager, TenantStaff, push_flash};
use crate::models::Flash;
use crate::state::AppState;

/// Shortest password accepted for a staff account.
pub const SENHA_MIN: usize = 6;

/// Roles `role` may hand out.
#[must_use]
pub fn papeis_atribuiveis(role: UserRole) -> Vec<UserRole> {
    UserRole::STAFF
        .into_iter()
        .filter(|r| role == UserRole::Admin || *r != UserRole::Admin)
        .collect()
}

// =============================================================================
// Views
// =============================================================================

#[derive(Clone, Debug)]
pub struct FuncionarioRow {
    pub id: i32,
    pub nome: String,
    pub email: String,
    pub papel: &'static str,
    pub ativo: bool,
}

impl From<&Funcionario> for FuncionarioRow {
    fn from(funcionario: &Funcionario) -> Self {
        Self {
            id: funcionario.id.as_i32(),
            nome: funcionario.nome.clone(),
            email: funcionario.email.to_string(),
            papel: funcionario.role.label(),
            ativo: funcionario.ativo,
        }
    }
}

#[derive(Clone, Debug)]
pub struct PapelOption {
    pub value: String,
    pub label: &'static str,
    pub selected: bool,
}

/// Employee form values, as typed. The password is never echoed back.
#[derive(Clone, Default, Deserialize)]
pub struct FuncionarioForm {
    #[serde(default)]
    pub nome: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub ativo: Option<String>,
    #[serde(default)]
    senha: String,
}

impl std::fmt::Debug for FuncionarioForm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FuncionarioForm")
            .field("nome", &self.nome)
            .field("email", &self.email)
            .field("role", &self.role)
            .field("senha", &"[REDACTED]")
            .finish_non_exhaustive()
    }
}

impl FuncionarioForm {
    #[must_use]
    pub fn novo() -> Self {
        Self {
            role: UserRole::Funcionario.to_string(),
            ativo: Some("on".to_string()),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn ativo(&self) -> bool {
        self.ativo.is_some()
    }

    /// Validate into the backend payload on behalf of a user with `autor`'s
    /// role.
    ///
    /// # Errors
    ///
    /// Returns the message to show above the form.
    pub fn parse(
        &self,
        autor: UserRole,
        criando: bool,
    ) -> std::result::Result<FuncionarioInput, String> {
        let nome = optional(&self.nome).ok_or("Preencha o campo nome.")?;
        let email = Email::parse(&self.email).map_err(|e| e.to_string())?;
        let role = self
            .role
            .parse::<UserRole>()
            .ok()
            .filter(|r| papeis_atribuiveis(autor).contains(r))
            .ok_or("Escolha um papel válido.")?;

        let senha = match optional(&self.senha) {
            Some(senha) if senha.chars().count() < SENHA_MIN => {
                return Err(format!("A senha deve ter pelo menos {SENHA_MIN} caracteres."));
            }
            None if criando => return Err("Defina uma senha para o novo acesso.".to_string()),
            senha => senha,
        };

        Ok(FuncionarioInput {
            nome,
            email,
            role,
            ativo: self.ativo(),
            senha,
        })
    }

    fn without_password(self) -> Self {
        Self {
            senha: String::new(),
            ..self
        }
    }

    fn papeis(&self, autor: UserRole) -> Vec<PapelOption> {
        papeis_atribuiveis(autor)
            .into_iter()
            .map(|role| {
                let value = role.to_string();
                PapelOption {
                    selected: value == self.role,
                    label: role.label(),
                    value,
                }
            })
            .collect()
    }
}

impl From<&Funcionario> for FuncionarioForm {
    fn from(funcionario: &Funcionario) -> Self {
        Self {
            nome: funcionario.nome.clone(),
            email: funcionario.email.to_string(),
            role: funcionario.role.to_string(),
            ativo: funcionario.ativo.then(|| "on".to_string()),
            senha: String::new(),
        }
    }
}

// =============================================================================
// Templates
// =============================================================================

#[derive(Template, WebTemplate)]
#[template(path = "funcionarios/index.html")]
pub struct FuncionariosTemplate {
    pub page: PageContext,
    pub slug: String,
    pub q: String,
    pub funcionarios: Vec<FuncionarioRow>,
}

#[derive(Template, WebTemplate)]
#[template(path = "funcionarios/form.html")]
pub struct FuncionarioFormTemplate {
    pub page: PageContext,
    pub slug: String,
    pub action: String,
    pub titulo: &'static str,
    pub criando: bool,
    pub form: FuncionarioForm,
    pub papeis: Vec<PapelOption>,
    pub erro: Option<String>,
}

// =============================================================================
// Handlers
// =============================================================================

/// GET /{slug}/funcionarios
#[instrument(skip(state, session, nonce, staff), fields(empresa_id = %staff.empresa_id))]
pub async fn index(
    RequireManager(staff): RequireManager,
    State(state): State<AppState>,
    session: Session,
    nonce: CspNonce,
    Query(query): Query<SearchQuery>,
) -> Result<FuncionariosTemplate> {
    let funcionarios = fetch_funcionarios(&state, &staff).await?;

    Ok(FuncionariosTemplate {
        page: PageContext::new(nonce, &session, &staff.user, "funcionarios").await,
        slug: staff.slug.to_string(),
        funcionarios: search::filter(&funcionarios, &query.q)
            .into_iter()
            .map(FuncionarioRow::from)
            .collect(),
        q: query.q,
    })
}

/// GET /{slug}/funcionarios/novo
pub async fn new(
    RequireManager(staff): RequireManager,
    session: Session,
    nonce: CspNonce,
) -> Response {
    let page = PageContext::new(nonce, &session, &staff.user, "funcionarios").await;
    render_form(page, &staff, None, FuncionarioForm::novo(), None)
}

/// POST /{slug}/funcionarios
#[instrument(skip_all, fields(empresa_id = %staff.empresa_id))]
pub async fn create(
    RequireManager(staff): RequireManager,
    State(state): State<AppState>,
    session: Session,
    nonce: CspNonce,
    Form(form): Form<FuncionarioForm>,
) -> Result<Response> {
    let erro = match form.parse(staff.user.role, true) {
        Ok(input) => match state
            .api()
            .criar_funcionario(staff.empresa_id, &input, &staff.user.bearer())
            .await
        {
            Ok(funcionario) => {
                tracing::info!(funcionario_id = %funcionario.id, role = %funcionario.role, "Employee created");
                let mensagem = format!("Acesso de {} criado.", funcionario.nome);
                return saved(&session, &staff, mensagem).await;
            }
            Err(e) => rejection_message(e.into())?,
        },
        Err(message) => message,
    };

    rejected(&session, nonce, &staff, None, form, erro).await
}

/// GET /{slug}/funcionarios/{id}
#[instrument(skip(state, session, nonce, staff), fields(empresa_id = %staff.empresa_id))]
pub async fn edit(
    RequireManager(staff): RequireManager,
    State(state): State<AppState>,
    session: Session,
    nonce: CspNonce,
    Path((_slug, id)): Path<(String, i32)>,
) -> Result<Response> {
    let funcionario = find_funcionario(&state, &staff, FuncionarioId::new(id)).await?;
    if !papeis_atribuiveis(staff.user.role).contains(&funcionario.role) {
        return Err(AppError::Forbidden(
            "Apenas administradores podem editar outros administradores.".to_string(),
        ));
    }

    let page = PageContext::new(nonce, &session, &staff.user, "funcionarios").await;
    let form = FuncionarioForm::from(&funcionario);
    Ok(render_form(page, &staff, Some(funcionario.id), form, None))
}

/// POST /{slug}/funcionarios/{id}
#[instrument(skip_all, fields(empresa_id = %staff.empresa_id, funcionario_id = id))]
pub async fn update(
    RequireManager(staff): RequireManager,
    State(state): State<AppState>,
    session: Session,
    nonce: CspNonce,
    Path((_slug, id)): Path<(String, i32)>,
    Form(form): Form<FuncionarioForm>,
) -> Result<Response> {
    let id = FuncionarioId::new(id);
    let erro = match form.parse(staff.user.role, false) {
        Ok(input) => match state
            .api()
            .atualizar_funcionario(id, &input, &staff.user.bearer())
            .await
        {
            Ok(funcionario) => {
                tracing::info!(funcionario_id = %funcionario.id, "Employee updated");
                let mensagem = format!("Acesso de {} atualizado.", funcionario.nome);
                return saved(&session, &staff, mensagem).await;
            }
            Err(e) => rejection_message(e.into())?,
        },
        Err(message) => message,
    };

    rejected(&session, nonce, &staff, Some(id), form, erro).await
}

/// POST /{slug}/funcionarios/{id}/excluir
#[instrument(skip(state, session, staff), fields(empresa_id = %staff.empresa_id))]
pub async fn delete(
    RequireManager(staff): RequireManager,
    State(state): State<AppState>,
    session: Session,
    Path((_slug, id)): Path<(String, i32)>,
) -> Result<Redirect> {
    let funcionario = find_funcionario(&state, &staff, FuncionarioId::new(id)).await?;

    let flash = if funcionario.email.as_str() == staff.user.email {
        Flash::erro("Você não pode excluir o próprio acesso.")
    } else if !papeis_atribuiveis(staff.user.role).contains(&funcionario.role) {
        Flash::erro("Apenas administradores podem excluir outros administradores.")
    } else {
        match state
            .api()
            .excluir_funcionario(funcionario.id, &staff.user.bearer())
            .await
        {
            Ok(()) => {
                tracing::info!(funcionario_id = %funcionario.id, "Employee deleted");
                Flash::sucesso(format!("Acesso de {} excluído.", funcionario.nome))
            }
            Err(e) => Flash::erro(rejection_message(e.into())?),
        }
    };

    push_flash(&session, flash).await?;
    Ok(Redirect::to(&list_path(&staff)))
}

async fn fetch_funcionarios(state: &AppState, staff: &TenantStaff) -> Result<Vec<Funcionario>> {
    Ok(state
        .api()
        .listar_funcionarios(staff.empresa_id, &staff.user.bearer())
        .await?)
}

async fn find_funcionario(
    state: &AppState,
    staff: &TenantStaff,
    id: FuncionarioId,
) -> Result<Funcionario> {
    fetch_funcionarios(state, staff)
        .await?
        .into_iter()
        .find(|f| f.id == id)
        .ok_or_else(|| AppError::NotFound(format!("funcionário {id}")))
}

fn list_path(staff: &TenantStaff) -> String {
    format!("/{}/funcionarios", staff.slug)
}

async fn saved(session: &Session, staff: &TenantStaff, mensagem: String) -> Result<Response> {
    push_flash(session, Flash::sucesso(mensagem)).await?;
    Ok(Redirect::to(&list_path(staff)).into_response())
}

async fn rejected(
    session: &Session,
    nonce: CspNonce,
    staff: &TenantStaff,
    id: Option<FuncionarioId>,
    form: FuncionarioForm,
    erro: String,
) -> Result<Response> {
    let page = PageContext::new(nonce, session, &staff.user, "funcionarios").await;
    let response = render_form(page, staff, id, form, Some(erro));
    Ok((StatusCode::UNPROCESSABLE_ENTITY, response).into_response())
}

fn render_form(
    page: PageContext,
    staff: &TenantStaff,
    id: Option<FuncionarioId>,
    form: FuncionarioForm,
    erro: Option<String>,
) -> Response {
    let (action, titulo) = match id {
        Some(id) => (format!("{}/{id}", list_path(staff)), "Editar acesso"),
        None => (list_path(staff), "Novo acesso"),
    };
    let form = form.without_password();
    FuncionarioFormTemplate {
        page,
        slug: staff.slug.to_string(),
        action,
        titulo,
        criando: id.is_none(),
        papeis: form.papeis(staff.user.role),
        form,
        erro,
    }
    .into_response()
}
