//! Menu products and their add-ons.

use serde::{Deserialize, Serialize};

use crate::types::{AdicionalId, EmpresaId, Price, ProdutoId};

/// An optional paid add-on attachable to a product line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Adicional {
    pub id: AdicionalId,
    pub nome: String,
    pub preco: Price,
}

/// A product on the menu.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Produto {
    pub id: ProdutoId,
    pub empresa_id: EmpresaId,
    #[serde(default)]
    pub categoria: String,
    pub nome: String,
    #[serde(default)]
    pub descricao: Option<String>,
    pub preco: Price,
    #[serde(default)]
    pub em_promocao: bool,
    #[serde(default)]
    pub preco_promocional: Option<Price>,
    #[serde(default = "default_true")]
    pub disponivel: bool,
    #[serde(default)]
    pub imagem_url: Option<String>,
    #[serde(default)]
    pub adicionais: Vec<Adicional>,
}

const fn default_true() -> bool {
    true
}

impl Produto {
    /// Price charged right now: the promotional price when the promotion is
    /// active and set, otherwise the base price.
    #[must_use]
    pub fn preco_vigente(&self) -> Price {
        match (self.em_promocao, self.preco_promocional) {
            (true, Some(promo)) => promo,
            _ => self.preco,
        }
    }

    /// Look up an add-on offered by this product.
    #[must_use]
    pub fn adicional(&self, id: AdicionalId) -> Option<&Adicional> {
        self.adicionais.iter().find(|a| a.id == id)
    }
}

/// Products grouped by category, in first-seen order.
#[derive(Debug, Clone)]
pub struct Categoria<'a> {
    pub nome: &'a str,
    pub produtos: Vec<&'a Produto>,
}

/// Group available products by category, keeping backend order.
#[must_use]
pub fn agrupar_por_categoria(produtos: &[Produto]) -> Vec<Categoria<'_>> {
    let mut categorias: Vec<Categoria<'_>> = Vec::new();
    for produto in produtos.iter().filter(|p| p.disponivel) {
        let nome = if produto.categoria.trim().is_empty() {
            "Outros"
        } else {
            produto.categoria.as_str()
        };
        match categorias.iter_mut().find(|c| c.nome == nome) {
            Some(categoria) => categoria.produtos.push(produto),
            None => categorias.push(Categoria {
                nome,
                produtos: vec![produto],
            }),
        }
    }
    categorias
}

/// Payload to create or update a product.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProdutoInput {
    pub categoria: String,
    pub nome: String,
    pub descricao: Option<String>,
    pub preco: Price,
    pub em_promocao: bool,
    pub preco_promocional: Option<Price>,
    pub disponivel: bool,
    pub imagem_url: Option<String>,
    pub adicionais: Vec<AdicionalInput>,
}

/// Add-on as edited in the product form.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AdicionalInput {
    pub nome: String,
    pub preco: Price,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn produto(id: i32, categoria: &str, disponivel: bool) -> Produto {
        Produto {
            id: ProdutoId::new(id),
            empresa_id: EmpresaId::new(1),
            categoria: categoria.to_string(),
            nome: format!("Produto {id}"),
            descricao: None,
            preco: Price::from_cents(1000),
            em_promocao: false,
            preco_promocional: None,
            disponivel,
            imagem_url: None,
            adicionais: vec![],
        }
    }

    #[test]
    fn test_preco_vigente_prefers_active_promotion() {
        let mut p = produto(1, "Pizzas", true);
        p.preco_promocional = Some(Price::from_cents(800));
        assert_eq!(p.preco_vigente(), Price::from_cents(1000));
        p.em_promocao = true;
        assert_eq!(p.preco_vigente(), Price::from_cents(800));
        p.preco_promocional = None;
        assert_eq!(p.preco_vigente(), Price::from_cents(1000));
    }

    #[test]
    fn test_grouping_keeps_order_and_skips_unavailable() {
        let produtos = vec![
            produto(1, "Pizzas", true),
            produto(2, "Bebidas", true),
            produto(3, "Pizzas", true),
            produto(4, "Bebidas", false),
            produto(5, " ", true),
        ];
        let grupos = agrupar_por_categoria(&produtos);
        let nomes: Vec<&str> = grupos.iter().map(|g| g.nome).collect();
        assert_eq!(nomes, vec!["Pizzas", "Bebidas", "Outros"]);
        assert_eq!(grupos.first().unwrap().produtos.len(), 2);
        assert_eq!(grupos.get(1).unwrap().produtos.len(), 1);
    }

    #[test]
    fn test_deserialize_minimal_product() {
        let json = r#"{"id": 3, "empresa_id": 1, "nome": "Coxinha", "preco": "6.50"}"#;
        let p: Produto = serde_json::from_str(json).unwrap();
        assert!(p.disponivel);
        assert!(p.adicionais.is_empty());
        assert_eq!(p.preco_vigente(), Price::from_cents(650));
    }
}
