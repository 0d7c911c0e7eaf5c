use std::slice::Iter;

use ledger::loan::{LoanId, LoanRecord};

/// A snapshot of every populated loan, the most recent first.
///
/// Never patched in place, each refresh builds a new one.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LoanCollection {
    loans: Vec<LoanRecord>,
    skipped: Vec<LoanId>,
}

impl LoanCollection {
    pub const fn empty() -> Self {
        Self {
            loans: vec![],
            skipped: vec![],
        }
    }

    /// The loans must come in descending identifier order and carry a borrower.
    pub(crate) fn new(loans: Vec<LoanRecord>, skipped: Vec<LoanId>) -> Self {
        debug_assert!(loans.windows(2).all(|pair| pair[0].id > pair[1].id));
        debug_assert!(loans.iter().all(|loan| !loan.borrower.is_zero()));

        Self { loans, skipped }
    }

    pub fn loans(&self) -> &[LoanRecord] {
        &self.loans
    }

    /// Identifiers left out because their records could not be read.
    pub fn skipped(&self) -> &[LoanId] {
        &self.skipped
    }

    pub fn get(&self, loan: LoanId) -> Option<&LoanRecord> {
        self.loans
            .binary_search_by(|record| loan.cmp(&record.id))
            .ok()
            .map(|at| &self.loans[at])
    }

    pub fn iter(&self) -> Iter<'_, LoanRecord> {
        self.loans.iter()
    }

    pub fn len(&self) -> usize {
        self.loans.len()
    }

    pub fn is_empty(&self) -> bool {
        self.loans.is_empty()
    }
}

impl<'c> IntoIterator for &'c LoanCollection {
    type Item = &'c LoanRecord;
    type IntoIter = Iter<'c, LoanRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
