//! Backend payloads as the restaurant API sends them.

use serde_json::{Value, json};

/// Company open around the clock with online ordering enabled.
#[must_use]
pub fn empresa(id: i32, slug: &str) -> Value {
    json!({
        "id": id,
        "slug": slug,
        "nome": "Pizzaria do Zé",
        "telefone": "31 3333-0000",
        "ativo": true,
        "permitir_pedidos_online": true,
        "desativar_entrega": false,
        "desativar_retirada": false,
        "taxa_entrega_padrao": 5,
        // Closing at the opening time means the range runs into the next day.
        "horarios": [
            {"dias": ["seg", "ter", "qua", "qui", "sex", "sab", "dom"], "abre": "00:00", "fecha": "00:00"}
        ]
    })
}

/// Product with one add-on.
#[must_use]
pub fn produto(id: i32, empresa_id: i32, nome: &str, preco: f64) -> Value {
    json!({
        "id": id,
        "empresa_id": empresa_id,
        "categoria": "Pizzas",
        "nome": nome,
        "descricao": "Molho, queijo e manjericão",
        "preco": preco,
        "disponivel": true,
        "adicionais": [
            {"id": 100 + id, "nome": "Borda recheada", "preco": 8}
        ]
    })
}

/// Order as returned after creation or by the tracker.
#[must_use]
pub fn pedido(id: i32, empresa_id: i32, status: &str) -> Value {
    json!({
        "id": id,
        "empresa_id": empresa_id,
        "cliente_nome": "Ana",
        "cliente_telefone": "31 99999-0000",
        "tipo_entrega": "retirada",
        "forma_pagamento": "pix",
        "itens": [
            {"produto_id": 1, "nome": "Margherita", "quantidade": 2, "preco_unitario": 42, "subtotal": 84}
        ],
        "subtotal": 84,
        "taxa_entrega": 0,
        "total": 84,
        "status": status,
        "criado_em": "2026-10-14T21:30:00Z"
    })
}

/// Result of a successful `POST /auth/login` for a tenant user.
#[must_use]
pub fn sessao(token: &str, role: &str, empresa_id: i32, slug: &str) -> Value {
    json!({
        "token": token,
        "usuario": {
            "id": 7,
            "nome": "Ana",
            "email": "ana@pizzaria.com",
            "role": role,
            "empresa_id": empresa_id,
            "empresa_slug": slug
        }
    })
}

#[must_use]
pub fn aviso(id: i32, empresa_id: i32, titulo: &str) -> Value {
    json!({
        "id": id,
        "empresa_id": empresa_id,
        "titulo": titulo,
        "mensagem": "",
        "ativo": true
    })
}
