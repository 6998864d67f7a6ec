//! Product catalogue route handlers.
//!
//! List, create, edit and delete products with their add-ons. Forms are
//! re-rendered with the typed values and a message when validation or the
//! backend refuses them.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use cardapio_core::models::{AdicionalInput, Produto, ProdutoInput};
use cardapio_core::{ProdutoId, search};
use tower_sessions::Session;
use tracing::instrument;

use super::forms::{FormFields, optional, parse_price};
use super::{PageContext, SearchQuery, rejection_message};
use crate::error::{AppError, Result};
use crate::middleware::{CspNonce, RequireManager, TenantStaff, push_flash};
use crate::models::Flash;
use crate::state::AppState;

/// Blank add-on rows offered below the existing ones.
const LINHAS_ADICIONAIS_VAZIAS: usize = 3;

// =============================================================================
// Views
// =============================================================================

/// Product row of the list page.
#[derive(Clone, Debug)]
pub struct ProdutoRow {
    pub id: i32,
    pub nome: String,
    pub categoria: String,
    pub preco: String,
    pub preco_promocional: Option<String>,
    pub disponivel: bool,
    pub adicionais: usize,
}

impl From<&Produto> for ProdutoRow {
    fn from(produto: &Produto) -> Self {
        Self {
            id: produto.id.as_i32(),
            nome: produto.nome.clone(),
            categoria: produto.categoria.clone(),
            preco: produto.preco.display(),
            preco_promocional: produto
                .em_promocao
                .then_some(produto.preco_promocional)
                .flatten()
                .map(|p| p.display()),
            disponivel: produto.disponivel,
            adicionais: produto.adicionais.len(),
        }
    }
}

/// One add-on row of the form, as typed.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AdicionalRow {
    pub nome: String,
    pub preco: String,
}

/// Product form values, as typed.
#[derive(Clone, Debug, Default)]
pub struct ProdutoForm {
    pub categoria: String,
    pub nome: String,
    pub descricao: String,
    pub preco: String,
    pub em_promocao: bool,
    pub preco_promocional: String,
    pub disponivel: bool,
    pub imagem_url: String,
    pub adicionais: Vec<AdicionalRow>,
}

impl ProdutoForm {
    /// Empty form for a new product.
    #[must_use]
    pub fn novo() -> Self {
        Self {
            disponivel: true,
            ..Self::default()
        }
        .with_blank_rows()
    }

    #[must_use]
    pub fn from_fields(fields: &FormFields) -> Self {
        let nomes = fields.all("adicional_nome");
        let precos = fields.all("adicional_preco");
        let adicionais = nomes
            .iter()
            .enumerate()
            .map(|(i, nome)| AdicionalRow {
                nome: (*nome).to_string(),
                preco: precos.get(i).copied().unwrap_or_default().to_string(),
            })
            .collect();

        Self {
            categoria: fields.get("categoria").to_string(),
            nome: fields.get("nome").to_string(),
            descricao: fields.get("descricao").to_string(),
            preco: fields.get("preco").to_string(),
            em_promocao: fields.checked("em_promocao"),
            preco_promocional: fields.get("preco_promocional").to_string(),
            disponivel: fields.checked("disponivel"),
            imagem_url: fields.get("imagem_url").to_string(),
            adicionais,
        }
    }

    /// Validate into the backend payload.
    ///
    /// Add-on rows left completely blank are ignored.
    ///
    /// # Errors
    ///
    /// Returns the message to show above the form.
    pub fn parse(&self) -> std::result::Result<ProdutoInput, String> {
        let nome = optional(&self.nome).ok_or("Preencha o campo nome.")?;
        let preco = parse_price(&self.preco, "Preço")?;

        let preco_promocional = match optional(&self.preco_promocional) {
            Some(raw) => Some(parse_price(&raw, "Preço promocional")?),
            None => None,
        };
        if self.em_promocao {
            match preco_promocional {
                None => return Err("Informe o preço promocional.".to_string()),
                Some(promo) if promo >= preco => {
                    return Err("O preço promocional deve ser menor que o preço.".to_string());
                }
                Some(_) => {}
            }
        }

        let mut adicionais = Vec::new();
        for row in &self.adicionais {
            match (optional(&row.nome), optional(&row.preco)) {
                (None, None) => {}
                (Some(nome), Some(preco)) => adicionais.push(AdicionalInput {
                    preco: parse_price(&preco, &format!("Adicional {nome}"))?,
                    nome,
                }),
                (Some(nome), None) => return Err(format!("Informe o preço do adicional {nome}.")),
                (None, Some(_)) => return Err("Informe o nome de cada adicional.".to_string()),
            }
        }

        Ok(ProdutoInput {
            categoria: self.categoria.trim().to_string(),
            nome,
            descricao: optional(&self.descricao),
            preco,
            em_promocao: self.em_promocao,
            preco_promocional,
            disponivel: self.disponivel,
            imagem_url: optional(&self.imagem_url),
            adicionais,
        })
    }

    fn with_blank_rows(mut self) -> Self {
        self.adicionais
            .extend(std::iter::repeat_n(AdicionalRow::default(), LINHAS_ADICIONAIS_VAZIAS));
        self
    }
}

impl From<&Produto> for ProdutoForm {
    fn from(produto: &Produto) -> Self {
        Self {
            categoria: produto.categoria.clone(),
            nome: produto.nome.clone(),
            descricao: produto.descricao.clone().unwrap_or_default(),
            preco: produto.preco.to_input(),
            em_promocao: produto.em_promocao,
            preco_promocional: produto
                .preco_promocional
                .map(|p| p.to_input())
                .unwrap_or_default(),
            disponivel: produto.disponivel,
            imagem_url: produto.imagem_url.clone().unwrap_or_default(),
            adicionais: produto
                .adicionais
                .iter()
                .map(|a| AdicionalRow {
                    nome: a.nome.clone(),
                    preco: a.preco.to_input(),
                })
                .collect(),
        }
        .with_blank_rows()
    }
}

/// Distinct categories in first-seen order, for the form's suggestions.
fn categorias(produtos: &[Produto]) -> Vec<String> {
    let mut categorias: Vec<String> = Vec::new();
    for produto in produtos {
        let categoria = produto.categoria.trim();
        if !categoria.is_empty() && !categorias.iter().any(|c| c == categoria) {
            categorias.push(categoria.to_string());
        }
    }
    categorias
}

// =============================================================================
// Templates
// =============================================================================

/// Product list template.
#[derive(Template, WebTemplate)]
#[template(path = "produtos/index.html")]
pub struct ProdutosTemplate {
    pub page: PageContext,
    pub slug: String,
    pub q: String,
    pub produtos: Vec<ProdutoRow>,
}

/// Product form template.
#[derive(Template, WebTemplate)]
#[template(path = "produtos/form.html")]
pub struct ProdutoFormTemplate {
    pub page: PageContext,
    pub slug: String,
    pub action: String,
    pub titulo: &'static str,
    pub form: ProdutoForm,
    pub categorias: Vec<String>,
    pub erro: Option<String>,
}

// =============================================================================
// Handlers
// =============================================================================

/// List products.
///
/// GET /{slug}/produtos
#[instrument(skip(state, session, nonce, staff), fields(empresa_id = %staff.empresa_id))]
pub async fn index(
    RequireManager(staff): RequireManager,
    State(state): State<AppState>,
    session: Session,
    nonce: CspNonce,
    Query(query): Query<SearchQuery>,
) -> Result<ProdutosTemplate> {
    let produtos = fetch_produtos(&state, &staff).await?;

    Ok(ProdutosTemplate {
        page: PageContext::new(nonce, &session, &staff.user, "produtos").await,
        slug: staff.slug.to_string(),
        produtos: search::filter(&produtos, &query.q)
            .into_iter()
            .map(ProdutoRow::from)
            .collect(),
        q: query.q,
    })
}

/// New product form.
///
/// GET /{slug}/produtos/novo
#[instrument(skip(state, session, nonce, staff), fields(empresa_id = %staff.empresa_id))]
pub async fn new(
    RequireManager(staff): RequireManager,
    State(state): State<AppState>,
    session: Session,
    nonce: CspNonce,
) -> Result<Response> {
    let produtos = fetch_produtos(&state, &staff).await?;
    let page = PageContext::new(nonce, &session, &staff.user, "produtos").await;
    Ok(render_form(page, &staff, None, ProdutoForm::novo(), categorias(&produtos), None))
}

/// Create a product.
///
/// POST /{slug}/produtos
#[instrument(skip_all, fields(empresa_id = %staff.empresa_id))]
pub async fn create(
    RequireManager(staff): RequireManager,
    State(state): State<AppState>,
    session: Session,
    nonce: CspNonce,
    Form(pairs): Form<Vec<(String, String)>>,
) -> Result<Response> {
    let form = ProdutoForm::from_fields(&FormFields::new(pairs));
    let erro = match form.parse() {
        Ok(input) => match state
            .api()
            .criar_produto(staff.empresa_id, &input, &staff.user.bearer())
            .await
        {
            Ok(produto) => {
                tracing::info!(produto_id = %produto.id, "Product created");
                return saved(&session, &staff, format!("Produto {} criado.", produto.nome)).await;
            }
            Err(e) => rejection_message(e.into())?,
        },
        Err(message) => message,
    };

    rejected(&state, &session, nonce, &staff, None, form, erro).await
}

/// Edit product form.
///
/// GET /{slug}/produtos/{id}
#[instrument(skip(state, session, nonce, staff), fields(empresa_id = %staff.empresa_id))]
pub async fn edit(
    RequireManager(staff): RequireManager,
    State(state): State<AppState>,
    session: Session,
    nonce: CspNonce,
    Path((_slug, id)): Path<(String, i32)>,
) -> Result<Response> {
    let id = ProdutoId::new(id);
    let produtos = fetch_produtos(&state, &staff).await?;
    let produto = produtos
        .iter()
        .find(|p| p.id == id)
        .ok_or_else(|| AppError::NotFound(format!("produto {id}")))?;

    let form = ProdutoForm::from(produto);
    let page = PageContext::new(nonce, &session, &staff.user, "produtos").await;
    Ok(render_form(page, &staff, Some(id), form, categorias(&produtos), None))
}

/// Update a product.
///
/// POST /{slug}/produtos/{id}
#[instrument(skip_all, fields(empresa_id = %staff.empresa_id, produto_id = id))]
pub async fn update(
    RequireManager(staff): RequireManager,
    State(state): State<AppState>,
    session: Session,
    nonce: CspNonce,
    Path((_slug, id)): Path<(String, i32)>,
    Form(pairs): Form<Vec<(String, String)>>,
) -> Result<Response> {
    let id = ProdutoId::new(id);
    let form = ProdutoForm::from_fields(&FormFields::new(pairs));
    let erro = match form.parse() {
        Ok(input) => match state
            .api()
            .atualizar_produto(id, &input, &staff.user.bearer())
            .await
        {
            Ok(produto) => {
                tracing::info!(produto_id = %produto.id, "Product updated");
                return saved(&session, &staff, format!("Produto {} atualizado.", produto.nome))
                    .await;
            }
            Err(e) => rejection_message(e.into())?,
        },
        Err(message) => message,
    };

    rejected(&state, &session, nonce, &staff, Some(id), form, erro).await
}

/// Delete a product.
///
/// POST /{slug}/produtos/{id}/excluir
#[instrument(skip(state, session, staff), fields(empresa_id = %staff.empresa_id))]
pub async fn delete(
    RequireManager(staff): RequireManager,
    State(state): State<AppState>,
    session: Session,
    Path((_slug, id)): Path<(String, i32)>,
) -> Result<Redirect> {
    let id = ProdutoId::new(id);
    let flash = match state.api().excluir_produto(id, &staff.user.bearer()).await {
        Ok(()) => {
            tracing::info!(produto_id = %id, "Product deleted");
            Flash::sucesso("Produto excluído.")
        }
        Err(e) => Flash::erro(rejection_message(e.into())?),
    };

    push_flash(&session, flash).await?;
    Ok(Redirect::to(&list_path(&staff)))
}

async fn fetch_produtos(state: &AppState, staff: &TenantStaff) -> Result<Vec<Produto>> {
    Ok(state
        .api()
        .listar_produtos(staff.empresa_id, &staff.user.bearer())
        .await?)
}

fn list_path(staff: &TenantStaff) -> String {
    format!("/{}/produtos", staff.slug)
}

async fn saved(session: &Session, staff: &TenantStaff, mensagem: String) -> Result<Response> {
    push_flash(session, Flash::sucesso(mensagem)).await?;
    Ok(Redirect::to(&list_path(staff)).into_response())
}

async fn rejected(
    state: &AppState,
    session: &Session,
    nonce: CspNonce,
    staff: &TenantStaff,
    id: Option<ProdutoId>,
    form: ProdutoForm,
    erro: String,
) -> Result<Response> {
    // Suggestions are a convenience; the form still renders without them.
    let sugestoes = fetch_produtos(state, staff)
        .await
        .map(|produtos| categorias(&produtos))
        .unwrap_or_default();
    let page = PageContext::new(nonce, session, &staff.user, "produtos").await;
    let response = render_form(page, staff, id, form, sugestoes, Some(erro));
    Ok((StatusCode::UNPROCESSABLE_ENTITY, response).into_response())
}

fn render_form(
    page: PageContext,
    staff: &TenantStaff,
    id: Option<ProdutoId>,
    form: ProdutoForm,
    categorias: Vec<String>,
    erro: Option<String>,
) -> Response {
    let (action, titulo) = match id {
        Some(id) => (format!("{}/{id}", list_path(staff)), "Editar produto"),
        None => (list_path(staff), "Novo produto"),
    };
    ProdutoFormTemplate {
        page,
        slug: staff.slug.to_string(),
        action,
        titulo,
        form,
        categorias,
        erro,
    }
    .into_response()
}
