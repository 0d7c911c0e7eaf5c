use ledger::{
    error::{Error, Result},
    loan::{Funds, InterestRate, LoanId, LoanRequest},
    operation::Operation,
};

/// A loan request as typed by the borrower, amounts in the display unit.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LoanForm<'f> {
    pub principal: &'f str,
    pub collateral: &'f str,
    /// Left empty, it stands for no interest.
    pub interest_rate: &'f str,
}

impl LoanForm<'_> {
    pub(crate) fn parse(&self) -> Result<LoanRequest> {
        let principal = amount("principal", self.principal)?;
        let collateral = amount("collateral", self.collateral)?;
        let interest_rate = interest_rate(self.interest_rate)?;

        LoanRequest::new(principal, collateral, interest_rate)
    }
}

pub(crate) fn loan_id(operation: Operation, input: &str) -> Result<LoanId> {
    let input = input.trim();
    if input.is_empty() {
        return Err(invalid(operation, "enter a loan identifier".into()));
    }

    input.parse::<LoanId>().map_err(|cause| {
        invalid(
            operation,
            format!("invalid loan identifier '{input}', {cause}"),
        )
    })
}

fn amount(field: &'static str, input: &str) -> Result<Funds> {
    if input.trim().is_empty() {
        return Err(invalid(Operation::RequestLoan, format!("enter the {field}")));
    }

    Funds::from_display(input).map_err(|err| invalid(Operation::RequestLoan, err.to_string()))
}

fn interest_rate(input: &str) -> Result<InterestRate> {
    let input = input.trim();
    if input.is_empty() {
        Ok(0)
    } else if input.bytes().all(|byte| byte.is_ascii_digit()) {
        input.parse().map_err(|_| {
            invalid(
                Operation::RequestLoan,
                format!("interest rate '{input}' is out of range"),
            )
        })
    } else {
        Err(invalid(
            Operation::RequestLoan,
            format!("interest rate '{input}' is not a whole number"),
        ))
    }
}

fn invalid(operation: Operation, cause: String) -> Error {
    Error::ValidationFailed { operation, cause }
}
