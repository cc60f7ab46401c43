//! Forward-only section state machine over the statement's line sequence.
//!
//! Anchors only ever advance the state. An anchor for a section behind the
//! current one is plain content; merchant text is allowed to look like an
//! anchor without moving the machine backwards.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Section {
    Header,
    Summary,
    PaymentInfo,
    Transactions,
    End,
}

/// Section anchors as printed by the issuer, matched accent- and
/// case-insensitively against the start of the trimmed line.
const ANCHORS: &[(&str, Section)] = &[
    ("RESUMO DA FATURA", Section::Summary),
    ("PAGAMENTO MINIMO", Section::PaymentInfo),
    ("FORMAS DE PAGAMENTO", Section::PaymentInfo),
    ("LANCAMENTOS", Section::Transactions),
    ("COMPRAS E SAQUES", Section::Transactions),
    ("TOTAL DESTA FATURA", Section::End),
];

#[derive(Debug, Clone)]
pub struct Segmenter {
    current: Section,
    saw_transactions: bool,
}

impl Default for Segmenter {
    fn default() -> Self {
        Self::new()
    }
}

impl Segmenter {
    pub fn new() -> Self {
        Self {
            current: Section::Header,
            saw_transactions: false,
        }
    }

    /// Tag one line, advancing the state when it is a forward anchor. The
    /// anchor line itself already belongs to the section it opens.
    pub fn observe(&mut self, line: &str) -> Section {
        if let Some(section) = anchor_for(line)
            && section > self.current
        {
            self.current = section;
            if section == Section::Transactions {
                self.saw_transactions = true;
            }
        }
        self.current
    }

    pub fn current(&self) -> Section {
        self.current
    }

    /// False after input exhaustion means the document is unusable.
    pub fn reached_transactions(&self) -> bool {
        self.saw_transactions
    }
}

/// Structural anchor lines are not transaction content; statements repeat
/// the block heading on every page.
pub(crate) fn is_anchor(line: &str) -> bool {
    anchor_for(line).is_some()
}

/// True when the trimmed line is exactly an anchor heading or starts with
/// one followed by trailing content (the END anchor carries the total).
fn anchor_for(line: &str) -> Option<Section> {
    let folded = fold_for_anchor(line.trim());
    ANCHORS
        .iter()
        .find(|(anchor, _)| folded.starts_with(anchor))
        .map(|&(_, section)| section)
}

/// Uppercase and strip the diacritics the issuer prints inconsistently.
fn fold_for_anchor(s: &str) -> String {
    s.chars()
        .flat_map(|c| c.to_uppercase())
        .map(|c| match c {
            'Á' | 'À' | 'Â' | 'Ã' => 'A',
            'É' | 'Ê' => 'E',
            'Í' => 'I',
            'Ó' | 'Ô' | 'Õ' => 'O',
            'Ú' | 'Ü' => 'U',
            'Ç' => 'C',
            other => other,
        })
        .collect()
}
