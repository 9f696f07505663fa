use crate::domain::booking::{Booking, BookingId, BookingStatus, PaymentStatus, VerificationStatus};
use crate::domain::money::Money;
use crate::error::Result;
use rust_decimal::Decimal;
use serde::Serialize;
use std::io::Write;

/// One row of the end-of-run booking report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BookingSummary {
    pub booking: BookingId,
    pub status: BookingStatus,
    pub verification_status: VerificationStatus,
    pub payment_status: PaymentStatus,
    pub pending_charges: Option<Decimal>,
    pub charges_waived: Option<Decimal>,
}

fn report_amount(amount: Option<Money>) -> Option<Decimal> {
    amount.map(|a| a.value().normalize())
}

impl From<&Booking> for BookingSummary {
    fn from(booking: &Booking) -> Self {
        Self {
            booking: booking.id,
            status: booking.status,
            verification_status: booking.verification_status,
            payment_status: booking.payment_status,
            pending_charges: report_amount(booking.pending_charges_amount),
            charges_waived: report_amount(booking.charges_waived_amount),
        }
    }
}

/// Writes booking summaries as CSV.
pub struct BookingWriter<W: Write> {
    writer: csv::Writer<W>,
}

impl<W: Write> BookingWriter<W> {
    pub fn new(target: W) -> Self {
        Self {
            writer: csv::Writer::from_writer(target),
        }
    }

    /// Writes one row per booking, ordered by booking id so the report is
    /// stable across stores.
    pub fn write_bookings(&mut self, bookings: impl IntoIterator<Item = Booking>) -> Result<()> {
        let mut rows: Vec<BookingSummary> = bookings.into_iter().map(|b| (&b).into()).collect();
        rows.sort_by_key(|r| r.booking);

        for row in rows {
            self.writer.serialize(row)?;
        }
        self.writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    #[test]
    fn test_writes_header_and_rows() {
        let mut settled = Booking::new(Uuid::nil(), "guest@example.com");
        settled.verification_status = VerificationStatus::PendingCharges;
        settled.charges_waived_amount = Some(Money::new(dec!(35.00)).unwrap());
        settled.complete_settlement(PaymentStatus::PartialPaid);

        let mut out = Vec::new();
        BookingWriter::new(&mut out)
            .write_bookings(vec![settled])
            .unwrap();

        let text = String::from_utf8(out).unwrap();
        let mut lines = text.lines();
        assert_eq!(
            lines.next(),
            Some("booking,status,verification_status,payment_status,pending_charges,charges_waived")
        );
        assert_eq!(
            lines.next(),
            Some("00000000-0000-0000-0000-000000000000,COMPLETED,COMPLETED,PARTIAL_PAID,,35")
        );
        assert_eq!(lines.next(), None);
    }
}
