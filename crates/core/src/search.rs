//! Case-insensitive substring filtering for back-office list pages.

use crate::models::{Aviso, Empresa, Endereco, Funcionario, Produto};

/// Records that can be filtered by a free-text query.
pub trait Searchable {
    /// Text fields the query is matched against.
    fn search_fields(&self) -> Vec<&str>;
}

/// Whether any field contains `query`, ignoring case and surrounding spaces.
/// An empty query matches everything.
#[must_use]
pub fn matches(query: &str, fields: &[&str]) -> bool {
    let query = query.trim().to_lowercase();
    query.is_empty() || fields.iter().any(|f| f.to_lowercase().contains(&query))
}

/// Items matching `query`, in their original order.
#[must_use]
pub fn filter<'a, T: Searchable>(items: &'a [T], query: &str) -> Vec<&'a T> {
    items
        .iter()
        .filter(|item| matches(query, &item.search_fields()))
        .collect()
}

impl Searchable for Produto {
    fn search_fields(&self) -> Vec<&str> {
        let mut fields = vec![self.nome.as_str(), self.categoria.as_str()];
        if let Some(descricao) = &self.descricao {
            fields.push(descricao);
        }
        fields
    }
}

impl Searchable for Funcionario {
    fn search_fields(&self) -> Vec<&str> {
        vec![self.nome.as_str(), self.email.as_str(), self.role.label()]
    }
}

impl Searchable for Endereco {
    fn search_fields(&self) -> Vec<&str> {
        vec![self.bairro.as_str()]
    }
}

impl Searchable for Aviso {
    fn search_fields(&self) -> Vec<&str> {
        vec![self.titulo.as_str(), self.mensagem.as_str()]
    }
}

impl Searchable for Empresa {
    fn search_fields(&self) -> Vec<&str> {
        let mut fields = vec![self.nome.as_str(), self.slug.as_str()];
        if let Some(cnpj) = &self.cnpj {
            fields.push(cnpj);
        }
        fields
    }
}
