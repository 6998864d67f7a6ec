//! Public menu route handlers.

use askama::Template;
use askama_web::WebTemplate;
use axum::extract::{Path, Query, State};
use cardapio_core::models::{Empresa, Produto, agrupar_por_categoria};
use cardapio_core::search;
use cardapio_core::{OrderGate, ProdutoId, TipoEntrega};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use super::{TenantContext, load_tenant};
use crate::error::{AppError, Result};
use crate::middleware::{CspNonce, load_carrinho, take_flash};
use crate::models::Flash;
use crate::state::AppState;

// =============================================================================
// Views
// =============================================================================

/// Company header data for templates.
#[derive(Clone)]
pub struct EmpresaView {
    pub slug: String,
    pub nome: String,
    pub logo_url: Option<String>,
    pub telefone: Option<String>,
    pub endereco: Option<String>,
    pub horarios: String,
}

impl From<&Empresa> for EmpresaView {
    fn from(empresa: &Empresa) -> Self {
        Self {
            slug: empresa.slug.as_str().to_string(),
            nome: empresa.nome.clone(),
            logo_url: empresa.logo_url.clone(),
            telefone: empresa.telefone.clone(),
            endereco: empresa.endereco.clone(),
            horarios: empresa.horarios.to_text(),
        }
    }
}

/// A delivery type option.
#[derive(Clone)]
pub struct TipoView {
    pub value: &'static str,
    pub label: &'static str,
}

impl From<TipoEntrega> for TipoView {
    fn from(tipo: TipoEntrega) -> Self {
        Self {
            value: tipo.as_str(),
            label: tipo.label(),
        }
    }
}

/// What the menu lets the customer do right now.
#[derive(Clone)]
pub struct GateView {
    pub pode_adicionar: bool,
    pub pode_finalizar: bool,
    pub motivo: Option<String>,
    pub tipos: Vec<TipoView>,
}

impl From<&OrderGate> for GateView {
    fn from(gate: &OrderGate) -> Self {
        Self {
            pode_adicionar: gate.pode_adicionar,
            pode_finalizar: gate.pode_finalizar,
            motivo: gate.motivo.map(str::to_string),
            tipos: gate.tipos_permitidos().into_iter().map(TipoView::from).collect(),
        }
    }
}

/// Product card data.
#[derive(Clone)]
pub struct ProdutoView {
    pub id: i32,
    pub nome: String,
    pub descricao: Option<String>,
    pub preco: String,
    /// Base price shown struck through while a promotion runs.
    pub preco_original: Option<String>,
    pub imagem_url: Option<String>,
    pub tem_adicionais: bool,
}

impl From<&Produto> for ProdutoView {
    fn from(produto: &Produto) -> Self {
        let vigente = produto.preco_vigente();
        Self {
            id: produto.id.as_i32(),
            nome: produto.nome.clone(),
            descricao: produto.descricao.clone().filter(|d| !d.trim().is_empty()),
            preco: vigente.display(),
            preco_original: (vigente != produto.preco).then(|| produto.preco.display()),
            imagem_url: produto.imagem_url.clone(),
            tem_adicionais: !produto.adicionais.is_empty(),
        }
    }
}

/// Menu section.
#[derive(Clone)]
pub struct CategoriaView {
    pub nome: String,
    pub produtos: Vec<ProdutoView>,
}

/// Notice banner.
#[derive(Clone)]
pub struct AvisoView {
    pub titulo: String,
    pub mensagem: String,
}

/// Add-on checkbox.
#[derive(Clone)]
pub struct AdicionalView {
    pub id: i32,
    pub nome: String,
    pub preco: String,
}

// =============================================================================
// Templates
// =============================================================================

/// Menu page template.
#[derive(Template, WebTemplate)]
#[template(path = "menu/show.html")]
pub struct MenuTemplate {
    pub nonce: String,
    pub flash: Option<Flash>,
    pub empresa: EmpresaView,
    pub gate: GateView,
    pub avisos: Vec<AvisoView>,
    pub categorias: Vec<CategoriaView>,
    pub busca: String,
    pub count: u32,
    pub total: String,
}

/// Product detail fragment (HTMX modal).
#[derive(Template, WebTemplate)]
#[template(path = "partials/produto_modal.html")]
pub struct ProdutoModalTemplate {
    pub slug: String,
    pub produto: ProdutoView,
    pub adicionais: Vec<AdicionalView>,
    pub gate: GateView,
}

/// Menu query parameters.
#[derive(Debug, Deserialize)]
pub struct MenuQuery {
    #[serde(default)]
    pub q: String,
}

// =============================================================================
// Handlers
// =============================================================================

/// Display a restaurant's menu.
#[instrument(skip(state, session, nonce))]
pub async fn show(
    State(state): State<AppState>,
    session: Session,
    CspNonce(nonce): CspNonce,
    Path(slug): Path<String>,
    Query(query): Query<MenuQuery>,
) -> Result<MenuTemplate> {
    let TenantContext { slug, empresa, gate } = load_tenant(&state, &slug).await?;

    let (produtos, avisos) = tokio::join!(
        state.api().cardapio(slug.as_str()),
        state.api().avisos_publicos(slug.as_str()),
    );
    let produtos = produtos?;
    let avisos = avisos.unwrap_or_else(|e| {
        tracing::warn!(slug = %slug, error = %e, "Failed to load notices");
        Vec::new()
    });

    let visiveis: Vec<Produto> = search::filter(&produtos, &query.q)
        .into_iter()
        .cloned()
        .collect();
    let categorias = agrupar_por_categoria(&visiveis)
        .into_iter()
        .map(|categoria| CategoriaView {
            nome: categoria.nome.to_string(),
            produtos: categoria.produtos.into_iter().map(ProdutoView::from).collect(),
        })
        .collect();

    let carrinho = load_carrinho(&session, &slug).await;

    Ok(MenuTemplate {
        nonce,
        flash: take_flash(&session).await,
        empresa: EmpresaView::from(&empresa),
        gate: GateView::from(&gate),
        avisos: avisos
            .into_iter()
            .filter(|a| a.ativo)
            .map(|a| AvisoView {
                titulo: a.titulo,
                mensagem: a.mensagem,
            })
            .collect(),
        categorias,
        busca: query.q.trim().to_string(),
        count: carrinho.calcular_quantidade_total(),
        total: carrinho.calcular_total().display(),
    })
}

/// Product detail fragment with the add-to-cart form (HTMX).
#[instrument(skip(state))]
pub async fn produto(
    State(state): State<AppState>,
    Path((slug, id)): Path<(String, i32)>,
) -> Result<ProdutoModalTemplate> {
    let TenantContext { slug, gate, .. } = load_tenant(&state, &slug).await?;
    let produto = find_produto(&state, slug.as_str(), ProdutoId::new(id)).await?;

    Ok(ProdutoModalTemplate {
        slug: slug.into_inner(),
        adicionais: produto
            .adicionais
            .iter()
            .map(|a| AdicionalView {
                id: a.id.as_i32(),
                nome: a.nome.clone(),
                preco: a.preco.display(),
            })
            .collect(),
        produto: ProdutoView::from(&produto),
        gate: GateView::from(&gate),
    })
}

/// Fetch an available product from the menu.
pub(crate) async fn find_produto(state: &AppState, slug: &str, id: ProdutoId) -> Result<Produto> {
    state
        .api()
        .cardapio(slug)
        .await?
        .into_iter()
        .find(|p| p.id == id && p.disponivel)
        .ok_or_else(|| AppError::NotFound(format!("produto {id}")))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use cardapio_core::Price;

    fn produto(preco: i64, promocao: Option<i64>) -> Produto {
        serde_json::from_value(serde_json::json!({
            "id": 3,
            "empresa_id": 1,
            "categoria": "Pizzas",
            "nome": "Margherita",
            "descricao": "  ",
            "preco": Price::from_cents(preco).amount().to_string(),
            "em_promocao": promocao.is_some(),
            "preco_promocional": promocao.map(|c| Price::from_cents(c).amount().to_string()),
            "disponivel": true,
            "adicionais": []
        }))
        .unwrap()
    }

    #[test]
    fn test_produto_view_shows_original_price_during_promotion() {
        let view = ProdutoView::from(&produto(4000, Some(3500)));
        assert_eq!(view.preco, "R$ 35,00");
        assert_eq!(view.preco_original.as_deref(), Some("R$ 40,00"));
        assert!(view.descricao.is_none());
    }

    #[test]
    fn test_produto_view_without_promotion() {
        let view = ProdutoView::from(&produto(4000, None));
        assert_eq!(view.preco, "R$ 40,00");
        assert!(view.preco_original.is_none());
    }
}
