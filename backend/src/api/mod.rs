//! External operation surface
//!
//! Thin authorization layer in front of the orchestrator. Callers present
//! an explicit [`AuthContext`] (staff, or a member acting for themselves)
//! and every entry point checks the capability before any engine method
//! runs; nothing is inferred from a request object.
//!
//! Staff-only: checkout, return, hold status updates, fine create/update,
//! configuration updates, sweeps. Member-scoped: placing, confirming and
//! cancelling their own holds, and viewing their own loans and stats.

use crate::models::config::{ConfigurationUpdate, LoanConfiguration};
use crate::models::fine::Fine;
use crate::models::loan::Loan;
use crate::models::reservation::Reservation;
use crate::orchestrator::{
    CheckoutRequest, CirculationEngine, CirculationError, CreateFineRequest, CreateHoldRequest,
    LoanQuery, MemberCirculationStats, ReturnRequest, UpdateFineRequest, UpdateHoldRequest,
};

/// Who is calling, established by the embedding application's
/// authentication layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthContext {
    /// Library staff; may operate on any row
    Staff { librarian_id: String },

    /// A member; may only operate on their own rows
    Member { member_id: String },
}

impl AuthContext {
    /// Require staff capability.
    fn require_staff(&self) -> Result<&str, CirculationError> {
        match self {
            AuthContext::Staff { librarian_id } => Ok(librarian_id),
            AuthContext::Member { member_id } => Err(CirculationError::Forbidden(format!(
                "member {} cannot perform staff operations",
                member_id
            ))),
        }
    }

    /// Require staff, or the member named by `member_id` acting for
    /// themselves.
    fn require_self_or_staff(&self, member_id: &str) -> Result<(), CirculationError> {
        match self {
            AuthContext::Staff { .. } => Ok(()),
            AuthContext::Member {
                member_id: acting_id,
            } if acting_id == member_id => Ok(()),
            AuthContext::Member {
                member_id: acting_id,
            } => Err(CirculationError::Forbidden(format!(
                "member {} cannot act for member {}",
                acting_id, member_id
            ))),
        }
    }
}

/// Authorized facade over the circulation engine.
pub struct CirculationApi {
    engine: CirculationEngine,
}

impl CirculationApi {
    /// Wrap an engine.
    pub fn new(engine: CirculationEngine) -> Self {
        Self { engine }
    }

    /// Direct engine access for the embedding application (registration,
    /// event export).
    pub fn engine(&self) -> &CirculationEngine {
        &self.engine
    }

    // ------------------------------------------------------------------
    // Loans
    // ------------------------------------------------------------------

    /// POST /loans — staff only.
    pub fn checkout(
        &self,
        ctx: &AuthContext,
        request: CheckoutRequest,
    ) -> Result<Loan, CirculationError> {
        ctx.require_staff()?;
        self.engine.checkout(request)
    }

    /// POST /loans/{id}/return — staff only.
    pub fn return_loan(
        &self,
        ctx: &AuthContext,
        request: ReturnRequest,
    ) -> Result<Loan, CirculationError> {
        ctx.require_staff()?;
        self.engine.return_loan(request)
    }

    /// POST /loans/{id}/renew — staff, or the borrowing member.
    pub fn renew_loan(&self, ctx: &AuthContext, loan_id: &str) -> Result<Loan, CirculationError> {
        let loan = self
            .engine
            .get_loan(loan_id)
            .ok_or_else(|| CirculationError::LoanNotFound(loan_id.to_string()))?;
        ctx.require_self_or_staff(loan.member_id())?;
        self.engine.renew_loan(loan_id)
    }

    /// GET /loans — staff see everything; members see their own loans.
    pub fn list_loans(&self, ctx: &AuthContext, query: LoanQuery) -> Vec<Loan> {
        let query = match ctx {
            AuthContext::Staff { .. } => query,
            AuthContext::Member { member_id } => LoanQuery {
                member_id: Some(member_id.clone()),
                ..query
            },
        };
        self.engine.list_loans(&query)
    }

    /// GET /loans/stats/{memberId} — staff, or the member themselves.
    pub fn member_stats(
        &self,
        ctx: &AuthContext,
        member_id: &str,
    ) -> Result<MemberCirculationStats, CirculationError> {
        ctx.require_self_or_staff(member_id)?;
        self.engine.member_stats(member_id)
    }

    /// POST /loans/update-overdue — staff only.
    pub fn update_overdue_loans(&self, ctx: &AuthContext) -> Result<Vec<String>, CirculationError> {
        ctx.require_staff()?;
        Ok(self.engine.update_overdue_loans())
    }

    // ------------------------------------------------------------------
    // Holds
    // ------------------------------------------------------------------

    /// POST /reservations — staff, or the member placing their own hold.
    pub fn create_hold(
        &self,
        ctx: &AuthContext,
        request: CreateHoldRequest,
    ) -> Result<Reservation, CirculationError> {
        ctx.require_self_or_staff(&request.member_id)?;
        self.engine.create_hold(request)
    }

    /// PATCH /reservations/{id} — staff only.
    pub fn update_hold(
        &self,
        ctx: &AuthContext,
        request: UpdateHoldRequest,
    ) -> Result<Reservation, CirculationError> {
        ctx.require_staff()?;
        self.engine.update_hold(request)
    }

    /// POST /reservations/{id}/confirm-pickup — the holding member only.
    pub fn confirm_pickup(
        &self,
        ctx: &AuthContext,
        reservation_id: &str,
    ) -> Result<Reservation, CirculationError> {
        match ctx {
            AuthContext::Member { member_id } => {
                self.engine.confirm_pickup(reservation_id, member_id)
            }
            AuthContext::Staff { librarian_id } => Err(CirculationError::Forbidden(format!(
                "pickup confirmation belongs to the member, not staff {}",
                librarian_id
            ))),
        }
    }

    /// DELETE /reservations/{id} — staff, or the holding member.
    pub fn cancel_hold(
        &self,
        ctx: &AuthContext,
        reservation_id: &str,
    ) -> Result<Reservation, CirculationError> {
        let reservation = self
            .engine
            .get_reservation(reservation_id)
            .ok_or_else(|| CirculationError::ReservationNotFound(reservation_id.to_string()))?;
        ctx.require_self_or_staff(reservation.member_id())?;
        self.engine.cancel_hold(reservation_id)
    }

    /// POST /reservations/update-expired — staff only.
    pub fn expire_holds(&self, ctx: &AuthContext) -> Result<Vec<String>, CirculationError> {
        ctx.require_staff()?;
        Ok(self.engine.expire_holds())
    }

    // ------------------------------------------------------------------
    // Fines
    // ------------------------------------------------------------------

    /// POST /fines — staff only.
    pub fn create_fine(
        &self,
        ctx: &AuthContext,
        request: CreateFineRequest,
    ) -> Result<Fine, CirculationError> {
        ctx.require_staff()?;
        self.engine.create_fine(request)
    }

    /// PATCH /fines/{id} — staff only.
    pub fn update_fine(
        &self,
        ctx: &AuthContext,
        request: UpdateFineRequest,
    ) -> Result<Fine, CirculationError> {
        ctx.require_staff()?;
        self.engine.update_fine(request)
    }

    // ------------------------------------------------------------------
    // Configuration
    // ------------------------------------------------------------------

    /// GET /loan-configuration — staff only.
    pub fn configuration(&self, ctx: &AuthContext) -> Result<LoanConfiguration, CirculationError> {
        ctx.require_staff()?;
        Ok(self.engine.configuration())
    }

    /// PATCH /loan-configuration — staff only.
    pub fn update_configuration(
        &self,
        ctx: &AuthContext,
        update: &ConfigurationUpdate,
    ) -> Result<LoanConfiguration, CirculationError> {
        let librarian_id = ctx.require_staff()?.to_string();
        self.engine.update_configuration(update, &librarian_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_staff_capability() {
        let staff = AuthContext::Staff {
            librarian_id: "staff-1".to_string(),
        };
        let member = AuthContext::Member {
            member_id: "m1".to_string(),
        };

        assert_eq!(staff.require_staff(), Ok("staff-1"));
        assert!(matches!(
            member.require_staff(),
            Err(CirculationError::Forbidden(_))
        ));
    }

    #[test]
    fn test_member_scope() {
        let member = AuthContext::Member {
            member_id: "m1".to_string(),
        };

        assert!(member.require_self_or_staff("m1").is_ok());
        assert!(matches!(
            member.require_self_or_staff("m2"),
            Err(CirculationError::Forbidden(_))
        ));
    }
}
