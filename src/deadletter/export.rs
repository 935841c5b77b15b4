//! CSV extracts of dead-letter transactions for the banks' back offices.
//!
//! Each [ExportProfile] selects the transactions one downstream process needs
//! and decides which columns it receives. The profiles select disjoint sets of
//! transactions, which the tests below check.

use csv::{QuoteStyle, Terminator, WriterBuilder};
use serde::{Deserialize, Serialize};
use time::{
    Date, UtcOffset, format_description::BorrowedFormatItem, macros::format_description,
};

use crate::{Error, timezone::parse_timestamp, watchdog::Transaction};

const DATE_FORMAT: &[BorrowedFormatItem] = format_description!("[year]-[month]-[day]");

/// A column of an export file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportColumn {
    /// The UTC calendar date the transaction was dead-lettered, as `YYYY-MM-DD`.
    InsertionDate,
    TransactionId,
    PaymentToken,
    PaymentEndToEndId,
    GatewayAuthorizationStatus,
}

impl ExportColumn {
    /// The header of the column.
    pub fn name(self) -> &'static str {
        match self {
            ExportColumn::InsertionDate => "insertionDate",
            ExportColumn::TransactionId => "transactionId",
            ExportColumn::PaymentToken => "paymentToken",
            ExportColumn::PaymentEndToEndId => "paymentEndToEndId",
            ExportColumn::GatewayAuthorizationStatus => "gatewayAuthorizationStatus",
        }
    }

    /// The cell of this column for `transaction`. Missing values are empty.
    pub fn value(self, transaction: &Transaction) -> String {
        match self {
            ExportColumn::InsertionDate => transaction
                .insertion_date
                .as_deref()
                .and_then(format_utc_date)
                .unwrap_or_default(),
            ExportColumn::TransactionId => transaction.transaction_id.clone(),
            ExportColumn::PaymentToken => transaction.payment_token.clone().unwrap_or_default(),
            ExportColumn::PaymentEndToEndId => transaction
                .payment_end_to_end_id
                .clone()
                .unwrap_or_default(),
            ExportColumn::GatewayAuthorizationStatus => transaction
                .gateway_authorization_status
                .clone()
                .unwrap_or_default(),
        }
    }
}

fn format_utc_date(timestamp: &str) -> Option<String> {
    parse_timestamp(timestamp, UtcOffset::UTC)?
        .to_offset(UtcOffset::UTC)
        .date()
        .format(DATE_FORMAT)
        .ok()
}

const REFUND_COLUMNS: [ExportColumn; 4] = [
    ExportColumn::InsertionDate,
    ExportColumn::TransactionId,
    ExportColumn::PaymentToken,
    ExportColumn::PaymentEndToEndId,
];

const PENDING_COLUMNS: [ExportColumn; 4] = [
    ExportColumn::InsertionDate,
    ExportColumn::TransactionId,
    ExportColumn::PaymentToken,
    ExportColumn::GatewayAuthorizationStatus,
];

/// The CSV extracts operators can download.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExportProfile {
    /// Failed MyBank refunds through Intesa Sanpaolo.
    #[serde(rename = "mybank_intesa")]
    MyBankIntesa,
    /// Failed MyBank refunds through UniCredit.
    #[serde(rename = "mybank_unicredit")]
    MyBankUnicredit,
    /// BancomatPay payments stuck waiting for the gateway.
    #[serde(rename = "bancomat_pay")]
    BancomatPay,
}

impl ExportProfile {
    pub const ALL: [ExportProfile; 3] = [
        ExportProfile::MyBankIntesa,
        ExportProfile::MyBankUnicredit,
        ExportProfile::BancomatPay,
    ];

    /// The identifier used in query strings.
    pub fn key(self) -> &'static str {
        match self {
            ExportProfile::MyBankIntesa => "mybank_intesa",
            ExportProfile::MyBankUnicredit => "mybank_unicredit",
            ExportProfile::BancomatPay => "bancomat_pay",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ExportProfile::MyBankIntesa => "MyBank Intesa",
            ExportProfile::MyBankUnicredit => "MyBank Unicredit",
            ExportProfile::BancomatPay => "BancomatPay",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            ExportProfile::MyBankIntesa => "Storni MyBank Intesa (REFUND_ERROR, BCITITMM)",
            ExportProfile::MyBankUnicredit => "Storni MyBank Unicredit (REFUND_ERROR, UNCRITMM)",
            ExportProfile::BancomatPay => {
                "Transazioni BancomatPay con gatewayAuthorizationStatus = PENDING"
            }
        }
    }

    /// Whether `transaction` belongs in this extract.
    pub fn matches(self, transaction: &Transaction) -> bool {
        let method = transaction.payment_method_name.as_deref();

        match self {
            ExportProfile::MyBankIntesa => is_mybank_refund_error(transaction, "BCITITMM"),
            ExportProfile::MyBankUnicredit => is_mybank_refund_error(transaction, "UNCRITMM"),
            ExportProfile::BancomatPay => {
                transaction.gateway_authorization_status.as_deref() == Some("PENDING")
                    && method == Some("BANCOMATPAY")
            }
        }
    }

    pub fn columns(self) -> &'static [ExportColumn] {
        match self {
            ExportProfile::MyBankIntesa | ExportProfile::MyBankUnicredit => &REFUND_COLUMNS,
            ExportProfile::BancomatPay => &PENDING_COLUMNS,
        }
    }

    pub fn file_name_prefix(self) -> &'static str {
        match self {
            ExportProfile::MyBankIntesa => "StorniMyBank_Intesa",
            ExportProfile::MyBankUnicredit => "StorniMyBank_Unicredit",
            ExportProfile::BancomatPay => "BancomatPay_Pending",
        }
    }

    /// The name of the file exported for `date`, e.g. "BancomatPay_Pending_2025-03-01.csv".
    pub fn file_name(self, date: Date) -> String {
        format!("{}_{date}.csv", self.file_name_prefix())
    }

    /// How many of `transactions` belong in this extract.
    pub fn count_matching(self, transactions: &[Transaction]) -> usize {
        transactions
            .iter()
            .filter(|transaction| self.matches(transaction))
            .count()
    }
}

fn is_mybank_refund_error(transaction: &Transaction, psp_id: &str) -> bool {
    transaction.payment_method_name.as_deref() == Some("MYBANK")
        && transaction.e_commerce_status.as_deref() == Some("REFUND_ERROR")
        && transaction.psp_id.as_deref() == Some(psp_id)
}

/// Build the CSV extract of `transactions` for `profile`.
///
/// Fields containing a comma, quote or newline are quoted, with quotes doubled.
/// Rows end with `\n`.
///
/// # Errors
/// Returns [Error::NoMatchingTransactions] if no transaction matches, so that
/// an empty file is never produced.
pub fn build_csv(profile: ExportProfile, transactions: &[Transaction]) -> Result<String, Error> {
    let mut matching = transactions
        .iter()
        .filter(|transaction| profile.matches(transaction))
        .peekable();

    if matching.peek().is_none() {
        return Err(Error::NoMatchingTransactions(profile.label().to_owned()));
    }

    let mut writer = WriterBuilder::new()
        .terminator(Terminator::Any(b'\n'))
        .quote_style(QuoteStyle::Necessary)
        .from_writer(Vec::new());

    writer.write_record(profile.columns().iter().map(|column| column.name()))?;

    for transaction in matching {
        writer.write_record(
            profile
                .columns()
                .iter()
                .map(|column| column.value(transaction)),
        )?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|error| Error::CsvError(error.to_string()))?;

    String::from_utf8(bytes).map_err(|error| Error::CsvError(error.to_string()))
}

#[cfg(test)]
mod tests {
    use time::macros::date;

    use crate::{Error, test_utils::transaction, watchdog::Transaction};

    use super::{ExportColumn, ExportProfile, build_csv};

    fn mybank_refund_error(psp_id: &str) -> Transaction {
        Transaction {
            payment_method_name: Some("MYBANK".to_owned()),
            e_commerce_status: Some("REFUND_ERROR".to_owned()),
            gateway_authorization_status: Some("EXECUTED".to_owned()),
            psp_id: Some(psp_id.to_owned()),
            ..transaction("t1")
        }
    }

    fn bancomat_pending() -> Transaction {
        Transaction {
            payment_method_name: Some("BANCOMATPAY".to_owned()),
            gateway_authorization_status: Some("PENDING".to_owned()),
            e_commerce_status: Some("CLOSURE_ERROR".to_owned()),
            ..transaction("t2")
        }
    }

    fn matching_profiles(transaction: &Transaction) -> Vec<ExportProfile> {
        ExportProfile::ALL
            .into_iter()
            .filter(|profile| profile.matches(transaction))
            .collect()
    }

    #[test]
    fn intesa_refund_matches_only_intesa() {
        assert_eq!(
            matching_profiles(&mybank_refund_error("BCITITMM")),
            [ExportProfile::MyBankIntesa]
        );
    }

    #[test]
    fn unicredit_refund_matches_only_unicredit() {
        assert_eq!(
            matching_profiles(&mybank_refund_error("UNCRITMM")),
            [ExportProfile::MyBankUnicredit]
        );
    }

    #[test]
    fn pending_bancomat_matches_only_bancomat() {
        assert_eq!(
            matching_profiles(&bancomat_pending()),
            [ExportProfile::BancomatPay]
        );
    }

    #[test]
    fn profiles_are_mutually_exclusive() {
        let methods = [None, Some("MYBANK"), Some("BANCOMATPAY"), Some("CARDS")];
        let statuses = [None, Some("REFUND_ERROR"), Some("AUTHORIZED")];
        let gateway_statuses = [None, Some("PENDING"), Some("EXECUTED")];
        let psp_ids = [None, Some("BCITITMM"), Some("UNCRITMM"), Some("OTHER")];

        for method in methods {
            for status in statuses {
                for gateway_status in gateway_statuses {
                    for psp_id in psp_ids {
                        let transaction = Transaction {
                            payment_method_name: method.map(str::to_owned),
                            e_commerce_status: status.map(str::to_owned),
                            gateway_authorization_status: gateway_status.map(str::to_owned),
                            psp_id: psp_id.map(str::to_owned),
                            ..transaction("t")
                        };

                        let got = matching_profiles(&transaction);
                        assert!(got.len() <= 1, "{transaction:?} matched {got:?}");
                    }
                }
            }
        }
    }

    #[test]
    fn rejects_near_misses() {
        let wrong_method = Transaction {
            payment_method_name: Some("CARDS".to_owned()),
            ..mybank_refund_error("BCITITMM")
        };
        let wrong_status = Transaction {
            e_commerce_status: Some("COMPLETED".to_owned()),
            ..mybank_refund_error("BCITITMM")
        };
        let not_pending = Transaction {
            gateway_authorization_status: Some("EXECUTED".to_owned()),
            ..bancomat_pending()
        };

        assert!(matching_profiles(&wrong_method).is_empty());
        assert!(matching_profiles(&wrong_status).is_empty());
        assert!(matching_profiles(&not_pending).is_empty());
    }

    #[test]
    fn insertion_date_is_utc_date() {
        let cases = [
            (Some("2025-03-01T10:15:00Z"), "2025-03-01"),
            (Some("2025-03-01T00:30:00+02:00"), "2025-02-28"),
            (Some("2025-03-01T23:59:59.999Z"), "2025-03-01"),
            (Some("2025-03-01"), "2025-03-01"),
            (Some("garbage"), ""),
            (None, ""),
        ];

        for (insertion_date, want) in cases {
            let transaction = Transaction {
                insertion_date: insertion_date.map(str::to_owned),
                ..transaction("t")
            };

            let got = ExportColumn::InsertionDate.value(&transaction);

            assert_eq!(got, want, "insertion date {insertion_date:?}");
            assert!(got.is_empty() || got.len() == 10);
        }
    }

    #[test]
    fn missing_values_are_empty_cells() {
        let transaction = transaction("t");

        assert_eq!(ExportColumn::PaymentEndToEndId.value(&transaction), "");
        assert_eq!(ExportColumn::GatewayAuthorizationStatus.value(&transaction), "");
    }

    #[test]
    fn builds_intesa_csv() {
        let transactions = [
            Transaction {
                insertion_date: Some("2025-03-01T10:15:00Z".to_owned()),
                payment_token: Some("tok1".to_owned()),
                payment_end_to_end_id: Some("e2e1".to_owned()),
                ..mybank_refund_error("BCITITMM")
            },
            mybank_refund_error("UNCRITMM"),
            bancomat_pending(),
        ];

        let got = build_csv(ExportProfile::MyBankIntesa, &transactions).unwrap();

        assert_eq!(
            got,
            "insertionDate,transactionId,paymentToken,paymentEndToEndId\n\
             2025-03-01,t1,tok1,e2e1\n"
        );
    }

    #[test]
    fn builds_bancomat_csv_with_gateway_status() {
        let got = build_csv(ExportProfile::BancomatPay, &[bancomat_pending()]).unwrap();

        assert_eq!(
            got,
            "insertionDate,transactionId,paymentToken,gatewayAuthorizationStatus\n\
             ,t2,,PENDING\n"
        );
    }

    #[test]
    fn quotes_fields_that_need_it() {
        let transaction = Transaction {
            payment_token: Some("a,b".to_owned()),
            payment_end_to_end_id: Some("say \"hi\"".to_owned()),
            ..mybank_refund_error("BCITITMM")
        };
        let with_newline = Transaction {
            transaction_id: "line\nbreak".to_owned(),
            ..mybank_refund_error("BCITITMM")
        };

        let got = build_csv(ExportProfile::MyBankIntesa, &[transaction, with_newline]).unwrap();
        let rows: Vec<_> = got.splitn(2, '\n').collect();

        assert_eq!(
            rows[1],
            ",t1,\"a,b\",\"say \"\"hi\"\"\"\n,\"line\nbreak\",,\n"
        );
    }

    #[test]
    fn aborts_when_nothing_matches() {
        let got = build_csv(ExportProfile::BancomatPay, &[mybank_refund_error("BCITITMM")]);

        assert_eq!(
            got,
            Err(Error::NoMatchingTransactions("BancomatPay".to_owned()))
        );
    }

    #[test]
    fn file_name_uses_prefix_and_date() {
        assert_eq!(
            ExportProfile::MyBankUnicredit.file_name(date!(2025 - 03 - 01)),
            "StorniMyBank_Unicredit_2025-03-01.csv"
        );
    }

    #[test]
    fn profile_parses_from_query_key() {
        for profile in ExportProfile::ALL {
            let query = format!("profile={}", profile.key());
            let got: std::collections::HashMap<String, ExportProfile> =
                serde_urlencoded::from_str(&query).unwrap();

            assert_eq!(got["profile"], profile);
        }
    }
}
