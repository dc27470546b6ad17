//! Seed Data
//!
//! Default sections created with every list and the starter items of a
//! monthly list. Static configuration, not computed.

/// Default sections in display order
pub const DEFAULT_CATEGORIES: [&str; 9] = [
    "Mercearia",
    "Bebidas",
    "Laticínios",
    "Açougue",
    "Padaria",
    "Hortifruti",
    "Descartáveis e Papelaria",
    "Higiene e Limpeza",
    "Extra",
];

/// The one default section flagged as custom
pub const CUSTOM_CATEGORY: &str = "Extra";

/// Starter items of a monthly list: (category, [(name, quantity)])
pub const STARTER_ITEMS: &[(&str, &[(&str, u32)])] = &[
    (
        "Mercearia",
        &[
            ("Ovos (cartela com 20 unidades)", 7),
            ("Arroz 5kg", 1),
            ("Feijão 1kg", 2),
            ("Tapioca 1kg", 2),
            ("Óleo", 1),
            ("Sal", 1),
            ("Farinha de trigo", 1),
            ("Ketchup", 1),
            ("Fermento para bolos", 1),
            ("Cacau em pó 35%", 1),
            ("Açúcar", 1),
            ("Sacos de pipoca", 1),
            ("Pipoca", 1),
            ("Papel manteiga", 1),
            ("Margarina 1kg", 1),
            ("Chocolate meio amargo 1kg", 1),
            ("Nutella (tamanho médio)", 1),
        ],
    ),
    (
        "Descartáveis e Papelaria",
        &[
            ("Pratos descartáveis", 2),
            ("Copos descartáveis", 1),
            ("Papel toalha", 1),
            ("Guardanapo", 1),
        ],
    ),
    (
        "Laticínios",
        &[
            ("Leite semidesnatado", 3),
            ("Requeijão light", 2),
            ("Ricota light", 2),
        ],
    ),
    ("Hortifruti", &[("Uva", 1)]),
    (
        "Higiene e Limpeza",
        &[
            ("Cândida 2L", 1),
            ("Pato para privada", 1),
            ("Pedras para caixa acoplada", 1),
            ("Lysoform suave", 1),
            ("Detergente", 2),
            ("Shampoo e condicionador", 1),
            ("Refil de sabonete corporal", 1),
            ("Refil de sabonete íntimo", 1),
            ("Pasta de dente para sensibilidade", 1),
            ("Sabão líquido 1L", 1),
            ("Amaciante 500ml", 1),
            ("Álcool", 1),
            ("Listerine", 1),
        ],
    ),
];

const MONTH_NAMES: [&str; 12] = [
    "Janeiro", "Fevereiro", "Março", "Abril", "Maio", "Junho", "Julho", "Agosto", "Setembro",
    "Outubro", "Novembro", "Dezembro",
];

/// Month name for 1-12, empty otherwise
pub fn month_name(month: u32) -> &'static str {
    month
        .checked_sub(1)
        .and_then(|index| MONTH_NAMES.get(index as usize))
        .copied()
        .unwrap_or("")
}

/// Name of the default list for a month
pub fn monthly_list_name(month: u32, year: i32) -> String {
    format!("Lista de {} {}", month_name(month), year)
}

pub fn starter_item_count() -> usize {
    STARTER_ITEMS.iter().map(|(_, items)| items.len()).sum()
}
