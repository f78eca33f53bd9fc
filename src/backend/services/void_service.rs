// src/backend/services/void_service.rs
// Contract voiding and refund reconciliation.

use crate::adapter::email_adapter::EmailMessage;
use crate::adapter::stripe_adapter::{Expandable, PaymentIntent, PaymentProcessor, RefundRequest};
use crate::error::ContractError;
use crate::metrics;
use crate::models::{
    to_cents, ActorType, Contract, ContractEventType, ContractStatus, ContractView, Dollars,
    Payment, PaymentInfo, PaymentStatus, PrincipalId, RefundOption, RefundResult, RefundStatus,
    TimestampNs,
};
use crate::services::{audit_service, contract_service, notification_service};
use crate::storage::{contracts, parties, payments};
use crate::utils::crypto::calculate_sha256_hex;
use crate::utils::log::{log_error, log_info, log_warn};
use candid::CandidType;
use serde::{Deserialize, Serialize};
use serde_json::json;
use validator::Validate;

const BOTH_SIGNED_WARNING: &str =
    "Both parties had signed this contract. Voiding a fully executed contract may have legal implications.";

#[derive(CandidType, Deserialize, Serialize, Validate, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct VoidContractRequest {
    pub refund_option: Option<RefundOption>,
    #[validate(range(min = 0.0))]
    pub cancellation_fee: Option<Dollars>,
    #[validate(length(max = 1000))]
    pub refund_reason: Option<String>,
}

#[derive(CandidType, Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct VoidContractResponse {
    pub success: bool,
    pub message: String,
    pub contract: ContractView,
    pub payment_info: PaymentInfo,
    pub refund_option: RefundOption,
    pub refunds_processed: u32,
    pub refunds_failed: u32,
    pub refunds_kept: u32,
    pub refunds_manual: u32,
    pub refund_results: Vec<RefundResult>,
    pub warning: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VoidOutcome {
    pub response: VoidContractResponse,
    pub notifications: Vec<EmailMessage>,
}

/// Values stamped on every refund issued by one void.
struct RefundContext<'a> {
    contract_id: &'a str,
    reason: &'a str,
    voided_by: String,
    fee_share: Dollars,
    now: TimestampNs,
}

/// Loads the contract and enforces ownership and voidable status.
fn check_preconditions(caller: PrincipalId, contract_id: &str) -> Result<Contract, ContractError> {
    let contract = contract_service::load_owned_contract(caller, contract_id)?;
    match contract.status {
        ContractStatus::Cancelled => Err(ContractError::InvalidState(
            "Contract is already cancelled".to_string(),
        )),
        ContractStatus::Completed => Err(ContractError::InvalidState(
            "Completed contracts cannot be voided".to_string(),
        )),
        _ => Ok(contract),
    }
}

fn summarize_payments(
    contract: &Contract,
    completed: &[Payment],
    pending: &[Payment],
) -> PaymentInfo {
    let (payment_schedule, _) = contract.payment_schedule();
    PaymentInfo {
        total_paid: completed.iter().map(|p| p.amount).sum(),
        total_pending: pending.iter().map(|p| p.amount).sum(),
        completed_payments_count: completed.len() as u32,
        pending_payments_count: pending.len() as u32,
        deposit_amount: contract.deposit_amount,
        total_amount: contract.total_amount,
        payment_schedule,
    }
}

/// Voids a contract on behalf of its contractor and reconciles its payments.
///
/// The contract is cancelled before the first processor call, so a second
/// concurrent void fails the status check and never refunds twice.
pub async fn void_contract<P: PaymentProcessor>(
    processor: &P,
    caller: PrincipalId,
    contract_id: &str,
    request: VoidContractRequest,
    now: TimestampNs,
) -> Result<VoidOutcome, ContractError> {
    // 1. Preconditions
    let contract = check_preconditions(caller, contract_id)?;
    let previous_status = contract.status;
    let both_signed = contract.both_parties_signed();

    request
        .validate()
        .map_err(|e| ContractError::InvalidInput(format!("Invalid void request: {}", e)))?;
    let fee = request.cancellation_fee.unwrap_or(0.0);
    if !fee.is_finite() || fee < 0.0 {
        return Err(ContractError::InvalidInput(
            "cancellationFee must be a non-negative number".to_string(),
        ));
    }
    let option = request.refund_option.unwrap_or_default();
    let reason = request
        .refund_reason
        .clone()
        .filter(|r| !r.trim().is_empty())
        .unwrap_or_else(|| "Contract voided".to_string());

    // 2. Partition payments
    let all_payments = payments::list_for_contract(contract_id);
    let (completed, pending): (Vec<Payment>, Vec<Payment>) = all_payments
        .into_iter()
        .filter(|p| p.status != PaymentStatus::Failed)
        .partition(|p| p.status == PaymentStatus::Completed);
    let payment_info = summarize_payments(&contract, &completed, &pending);

    // 3. Cancel before any await
    let cancelled = contracts::cancel_if_voidable(contract_id, now).ok_or_else(|| {
        log_error!("Contract {} vanished or changed state during void", contract_id);
        ContractError::InternalError("Contract could not be cancelled".to_string())
    })?;
    log_info!(
        "🛑 Contract {} voided by {} (refund option {})",
        contract_id,
        caller,
        option.as_str()
    );

    // 4. Refunds
    let refund_results = match option {
        RefundOption::Keep => vec![aggregate_result(RefundStatus::Kept, payment_info.total_paid)],
        RefundOption::Manual => {
            vec![aggregate_result(RefundStatus::Manual, payment_info.total_paid)]
        }
        RefundOption::Automatic => {
            let fee_share = if completed.is_empty() {
                0.0
            } else {
                fee / completed.len() as Dollars
            };
            let ctx = RefundContext {
                contract_id,
                reason: &reason,
                voided_by: caller.to_text(),
                fee_share,
                now,
            };
            let mut results = Vec::with_capacity(completed.len());
            for payment in &completed {
                results.push(refund_payment(processor, payment, &ctx).await);
            }
            results
        }
    };

    // 5. Pending payments can no longer be collected
    for payment in &pending {
        if let Err(e) = payments::update_status(&payment.payment_id, PaymentStatus::Failed, now) {
            log_warn!("Failed to cancel pending payment {}: {}", payment.payment_id, e);
        }
    }

    // 6. Counts and message
    let completed_count = payment_info.completed_payments_count;
    let refunds_processed = count(&refund_results, |s| s == RefundStatus::Processed);
    let refunds_failed = count(&refund_results, |s| s.is_failure());
    let refunds_kept = if option == RefundOption::Keep { completed_count } else { 0 };
    let refunds_manual = (if option == RefundOption::Manual { completed_count } else { 0 })
        + count(&refund_results, |s| s == RefundStatus::ManualFollowUpRequired);
    let message = void_message(option, &payment_info, refunds_processed, fee);

    // 7. Audit
    let (payment_schedule, payment_schedule_config) = contract.payment_schedule();
    audit_service::record_event(
        contract_id,
        ContractEventType::ContractVoided,
        ActorType::Contractor,
        Some(caller.to_text()),
        json!({
            "previous_status": previous_status.as_str(),
            "both_parties_signed": both_signed,
            "payment_schedule": payment_schedule,
            "payment_schedule_config": payment_schedule_config,
            "total_paid": payment_info.total_paid,
            "total_pending": payment_info.total_pending,
            "refund_option": option.as_str(),
            "cancellation_fee": fee,
            "refund_reason": reason,
            "refund_results": refund_results,
        }),
        now,
    );
    metrics::record(|m| m.contracts_voided = m.contracts_voided.saturating_add(1));
    metrics::record_refund_results(&refund_results);

    let notifications = parties::get_client(&cancelled.client_id)
        .filter(|client| !client.email.is_empty())
        .map(|client| vec![notification_service::contract_voided(&cancelled, &client, &message)])
        .unwrap_or_default();

    Ok(VoidOutcome {
        response: VoidContractResponse {
            success: true,
            message,
            contract: ContractView::from(&cancelled),
            payment_info,
            refund_option: option,
            refunds_processed,
            refunds_failed,
            refunds_kept,
            refunds_manual,
            refund_results,
            warning: both_signed.then(|| BOTH_SIGNED_WARNING.to_string()),
        },
        notifications,
    })
}

fn count(results: &[RefundResult], pred: impl Fn(RefundStatus) -> bool) -> u32 {
    results.iter().filter(|r| pred(r.status)).count() as u32
}

fn aggregate_result(status: RefundStatus, total_paid: Dollars) -> RefundResult {
    RefundResult::for_payment("all", "all", total_paid).with_status(status)
}

fn void_message(
    option: RefundOption,
    info: &PaymentInfo,
    refunds_processed: u32,
    fee: Dollars,
) -> String {
    match option {
        RefundOption::Keep if info.total_paid > 0.0 => format!(
            "Contract voided. Payments of ${:.2} were kept.",
            info.total_paid
        ),
        RefundOption::Manual if info.total_paid > 0.0 => format!(
            "Contract voided. Please process refunds of ${:.2} manually.",
            info.total_paid
        ),
        RefundOption::Automatic if info.completed_payments_count > 0 => {
            if fee > 0.0 {
                format!(
                    "Contract voided. {} refund(s) processed with a ${:.2} cancellation fee.",
                    refunds_processed, fee
                )
            } else {
                format!("Contract voided. {} refund(s) processed.", refunds_processed)
            }
        }
        _ => "Contract voided successfully.".to_string(),
    }
}

/// Finds the payment intent behind a stored reference: checkout session
/// first, then the intent itself.
async fn resolve_intent<P: PaymentProcessor>(processor: &P, reference: &str) -> Option<PaymentIntent> {
    if !reference.starts_with("pi_") {
        match processor.retrieve_checkout_session(reference).await {
            Ok(session) => match session.payment_intent {
                Some(Expandable::Object(intent)) => return Some(*intent),
                Some(Expandable::Id(intent_id)) => {
                    return processor.retrieve_payment_intent(&intent_id).await.ok()
                }
                None => {}
            },
            Err(e) => log_info!("No checkout session for {}: {}", reference, e),
        }
    }
    processor.retrieve_payment_intent(reference).await.ok()
}

async fn refund_payment<P: PaymentProcessor>(
    processor: &P,
    payment: &Payment,
    ctx: &RefundContext<'_>,
) -> RefundResult {
    let base = RefundResult::for_payment(
        &payment.payment_id,
        payment.payment_type.as_str(),
        payment.amount,
    );
    let refund_amount = (payment.amount - ctx.fee_share).max(0.0);
    let base = RefundResult {
        cancellation_fee_applied: ctx.fee_share.min(payment.amount),
        ..base
    };

    // a. Locate the intent
    let Some(reference) = payment.payment_intent_id.as_deref() else {
        return base.with_error(RefundStatus::IntentNotFound, "No processor reference stored");
    };
    let Some(intent) = resolve_intent(processor, reference).await else {
        log_warn!("No payment intent found for payment {}", payment.payment_id);
        return base.with_error(
            RefundStatus::IntentNotFound,
            format!("No payment intent found for {}", reference),
        );
    };
    if !intent.is_succeeded() {
        return base.with_error(
            RefundStatus::NotRefundable,
            format!("Payment intent status is {}", intent.status),
        );
    }

    // b. Skip charges that were refunded out of band
    if let Some(charge_ref) = &intent.latest_charge {
        let charge = match charge_ref {
            Expandable::Object(charge) => Some((**charge).clone()),
            Expandable::Id(charge_id) => match processor.retrieve_charge(charge_id).await {
                Ok(charge) => Some(charge),
                Err(e) => {
                    log_warn!("Could not load charge {}: {}", charge_id, e);
                    None
                }
            },
        };
        if charge.is_some_and(|c| c.refunded) {
            return base.with_status(RefundStatus::AlreadyRefunded);
        }
    }

    // c. Nothing left after the fee share; no refund is created.
    if refund_amount <= 0.0 {
        return base.with_status(RefundStatus::FeeExceedsPayment);
    }

    // d. Refund
    let cents = to_cents(refund_amount);
    let request = RefundRequest {
        payment_intent_id: intent.id.clone(),
        amount_cents: cents,
        metadata: vec![
            ("contract_id".to_string(), ctx.contract_id.to_string()),
            ("reason".to_string(), ctx.reason.to_string()),
            ("voided_by".to_string(), ctx.voided_by.clone()),
            ("fee_applied".to_string(), format!("{:.2}", base.cancellation_fee_applied)),
            ("original_amount".to_string(), format!("{:.2}", payment.amount)),
        ],
        idempotency_key: calculate_sha256_hex(
            format!("{}:{}:{}", ctx.contract_id, payment.payment_id, cents).as_bytes(),
        ),
    };

    match processor.create_refund(&request).await {
        Ok(refund) => {
            log_info!(
                "💸 Refunded {} cents for payment {} ({})",
                cents,
                payment.payment_id,
                refund.id
            );
            let mut updated = payment.clone();
            updated.refund_id = Some(refund.id.clone());
            updated.refunded_amount = Some(refund_amount);
            updated.refunded_at = Some(ctx.now);
            updated.updated_at = ctx.now;
            payments::insert_payment(&updated);
            RefundResult {
                actual_refund_amount: refund_amount,
                refund_id: Some(refund.id),
                processor_status: refund.status,
                ..base.with_status(RefundStatus::Processed)
            }
        }
        Err(e) if e.is_already_refunded() => base.with_status(RefundStatus::AlreadyRefunded),
        Err(e) if e.is_insufficient_funds() => {
            log_warn!("Refund for {} needs manual follow-up: {}", payment.payment_id, e);
            base.with_error(RefundStatus::ManualFollowUpRequired, e.message)
        }
        Err(e) => {
            log_error!("Refund for {} failed: {}", payment.payment_id, e);
            base.with_error(RefundStatus::Failed, e.message)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::stripe_adapter::ProcessorError;
    use crate::services::test_support::*;
    use crate::storage::contract_events;
    use candid::Principal;
    use futures::executor::block_on;

    fn automatic(fee: f64) -> VoidContractRequest {
        VoidContractRequest {
            refund_option: Some(RefundOption::Automatic),
            cancellation_fee: Some(fee),
            refund_reason: Some("Client moved".into()),
        }
    }

    fn void(
        processor: &FakeProcessor,
        contract_id: &str,
        request: VoidContractRequest,
    ) -> Result<VoidOutcome, ContractError> {
        block_on(void_contract(
            processor,
            contractor_principal(),
            contract_id,
            request,
            NOW,
        ))
    }

    #[test]
    fn fee_is_split_evenly_across_completed_payments() {
        sent_contract("con_1", "t1", 100.0, 300.0);
        completed_payment("pay_a", "con_1", 100.0, "cs_a");
        completed_payment("pay_b", "con_1", 200.0, "pi_b");
        let processor = FakeProcessor::default()
            .with_succeeded_intent("a", 10_000)
            .with_session("cs_a", "pi_a")
            .with_succeeded_intent("b", 20_000);

        let outcome = void(&processor, "con_1", automatic(30.0)).unwrap();
        let refunds = processor.refund_requests.borrow();
        assert_eq!(refunds.len(), 2);
        assert_eq!(refunds[0].amount_cents, 8_500);
        assert_eq!(refunds[0].payment_intent_id, "pi_a");
        assert_eq!(refunds[1].amount_cents, 18_500);

        let response = outcome.response;
        assert_eq!(response.refunds_processed, 2);
        assert_eq!(response.refund_results[0].actual_refund_amount, 85.0);
        assert_eq!(response.refund_results[0].cancellation_fee_applied, 15.0);
        assert_eq!(response.refund_results[1].actual_refund_amount, 185.0);
        assert_eq!(
            response.message,
            "Contract voided. 2 refund(s) processed with a $30.00 cancellation fee."
        );
    }

    #[test]
    fn fee_exceeding_a_payment_creates_no_refund() {
        sent_contract("con_2", "t2", 50.0, 250.0);
        completed_payment("pay_c", "con_2", 50.0, "pi_c");
        completed_payment("pay_d", "con_2", 200.0, "pi_d");
        let processor = FakeProcessor::default()
            .with_succeeded_intent("c", 5_000)
            .with_succeeded_intent("d", 20_000);

        let outcome = void(&processor, "con_2", automatic(120.0)).unwrap();
        let results = &outcome.response.refund_results;
        assert_eq!(results[0].status, RefundStatus::FeeExceedsPayment);
        assert_eq!(results[0].actual_refund_amount, 0.0);
        assert_eq!(results[1].status, RefundStatus::Processed);
        let refunds = processor.refund_requests.borrow();
        assert_eq!(refunds.len(), 1);
        assert_eq!(refunds[0].amount_cents, 14_000);
        // Intent and charge lookups for both payments, one refund for pay_d.
        assert_eq!(processor.calls.get(), 5);
    }

    #[test]
    fn lookup_outcomes_take_precedence_over_the_fee_check() {
        sent_contract("con_fee", "t-fee", 50.0, 100.0);
        completed_payment("pay_r", "con_fee", 50.0, "pi_r");
        completed_payment("pay_g", "con_fee", 50.0, "cs_gone");
        let processor = FakeProcessor::default().with_succeeded_intent("r", 5_000);
        processor.charges.borrow_mut().get_mut("ch_r").unwrap().refunded = true;

        let response = void(&processor, "con_fee", automatic(120.0)).unwrap().response;
        let statuses: Vec<_> = response.refund_results.iter().map(|r| r.status).collect();
        assert_eq!(statuses, vec![RefundStatus::AlreadyRefunded, RefundStatus::IntentNotFound]);
        assert_eq!(response.refunds_failed, 1);
        assert!(processor.refund_requests.borrow().is_empty());
    }

    #[test]
    fn pending_payments_are_always_cancelled() {
        for (id, option) in [
            ("con_3", RefundOption::Automatic),
            ("con_4", RefundOption::Keep),
            ("con_5", RefundOption::Manual),
        ] {
            sent_contract(id, &format!("tok-{}", id), 100.0, 500.0);
            let pending = pending_payment(&format!("pend_{}", id), id, 400.0);
            let outcome = void(
                &FakeProcessor::default(),
                id,
                VoidContractRequest {
                    refund_option: Some(option),
                    ..Default::default()
                },
            )
            .unwrap();
            assert_eq!(outcome.response.payment_info.total_pending, 400.0);
            assert_eq!(
                payments::get_payment(&pending.payment_id).unwrap().status,
                PaymentStatus::Failed
            );
        }
    }

    #[test]
    fn keep_and_manual_make_no_processor_calls() {
        sent_contract("con_6", "t6", 100.0, 300.0);
        completed_payment("pay_e", "con_6", 100.0, "pi_e");
        completed_payment("pay_f", "con_6", 200.0, "pi_f");
        let processor = FakeProcessor::default();
        let outcome = void(
            &processor,
            "con_6",
            VoidContractRequest {
                refund_option: Some(RefundOption::Keep),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(processor.calls.get(), 0);
        assert_eq!(outcome.response.refund_results.len(), 1);
        assert_eq!(outcome.response.refund_results[0].status, RefundStatus::Kept);
        assert_eq!(outcome.response.refund_results[0].payment_id, "all");
        assert_eq!(outcome.response.refunds_kept, 2);
        assert_eq!(
            outcome.response.message,
            "Contract voided. Payments of $300.00 were kept."
        );

        sent_contract("con_7", "t7", 100.0, 300.0);
        completed_payment("pay_g", "con_7", 100.0, "pi_g");
        let outcome = void(
            &processor,
            "con_7",
            VoidContractRequest {
                refund_option: Some(RefundOption::Manual),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(processor.calls.get(), 0);
        assert_eq!(outcome.response.refund_results.len(), 1);
        assert_eq!(outcome.response.refund_results[0].status, RefundStatus::Manual);
        assert_eq!(outcome.response.refunds_manual, 1);
        assert_eq!(
            outcome.response.message,
            "Contract voided. Please process refunds of $100.00 manually."
        );
    }

    #[test]
    fn keep_without_payments_still_reports_one_entry() {
        sent_contract("con_8", "t8", 0.0, 300.0);
        let outcome = void(
            &FakeProcessor::default(),
            "con_8",
            VoidContractRequest {
                refund_option: Some(RefundOption::Keep),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(outcome.response.refund_results.len(), 1);
        assert_eq!(outcome.response.message, "Contract voided successfully.");
    }

    #[test]
    fn voiding_twice_is_rejected_without_side_effects() {
        sent_contract("con_9", "t9", 100.0, 100.0);
        completed_payment("pay_h", "con_9", 100.0, "pi_h");
        let processor = FakeProcessor::default().with_succeeded_intent("h", 10_000);
        void(&processor, "con_9", automatic(0.0)).unwrap();
        let calls = processor.calls.get();
        let events = contract_events::list_for_contract("con_9").len();

        let second = void(&processor, "con_9", automatic(0.0)).unwrap_err();
        assert_eq!(second, ContractError::InvalidState("Contract is already cancelled".into()));
        assert_eq!(second.status_code(), 400);
        assert_eq!(processor.calls.get(), calls);
        assert_eq!(processor.refund_requests.borrow().len(), 1);
        assert_eq!(contract_events::list_for_contract("con_9").len(), events);
    }

    #[test]
    fn end_to_end_automatic_void_of_a_single_deposit() {
        let mut contract = sent_contract("con_10", "t10", 100.0, 1_000.0);
        contract.status = ContractStatus::Paid;
        contract.signed_at = Some(NOW - 10);
        contracts::insert_contract(&contract);
        completed_payment("pay_i", "con_10", 100.0, "cs_i");
        let processor = FakeProcessor::default()
            .with_session("cs_i", "pi_i")
            .with_succeeded_intent("i", 10_000);

        let outcome = void(&processor, "con_10", VoidContractRequest::default()).unwrap();
        let response = &outcome.response;
        assert!(response.success);
        assert_eq!(response.refund_option, RefundOption::Automatic);
        assert_eq!(response.contract.status, ContractStatus::Cancelled);
        assert_eq!(response.refunds_processed, 1);
        assert_eq!(response.refunds_failed, 0);
        assert_eq!(response.message, "Contract voided. 1 refund(s) processed.");
        assert!(response.warning.is_some());

        let refund = &processor.refund_requests.borrow()[0];
        assert_eq!(refund.amount_cents, 10_000);
        assert!(refund
            .metadata
            .contains(&("contract_id".to_string(), "con_10".to_string())));
        assert!(refund
            .metadata
            .contains(&("original_amount".to_string(), "100.00".to_string())));

        let payment = payments::get_payment("pay_i").unwrap();
        assert_eq!(payment.refund_id.as_deref(), Some("re_1"));
        assert_eq!(payment.refunded_amount, Some(100.0));
        assert_eq!(
            contracts::get_contract("con_10").unwrap().status,
            ContractStatus::Cancelled
        );

        let events = contract_events::list_for_contract("con_10");
        let voided = events
            .iter()
            .find(|e| e.event_type == ContractEventType::ContractVoided)
            .unwrap();
        assert!(voided.metadata.contains("\"previous_status\":\"paid\""));
        assert_eq!(outcome.notifications.len(), 1);
        assert_eq!(outcome.notifications[0].to, "jane@client.test");
    }

    #[test]
    fn processor_outcomes_are_itemized() {
        sent_contract("con_11", "t11", 100.0, 100.0);
        completed_payment("pay_j", "con_11", 100.0, "pi_j");
        let processor = FakeProcessor::default().with_succeeded_intent("j", 10_000);
        *processor.refund_error.borrow_mut() = Some(ProcessorError::new(
            Some("insufficient_funds"),
            "Insufficient balance",
            Some(402),
        ));
        let outcome = void(&processor, "con_11", automatic(0.0)).unwrap();
        assert_eq!(
            outcome.response.refund_results[0].status,
            RefundStatus::ManualFollowUpRequired
        );
        assert_eq!(outcome.response.refunds_manual, 1);

        sent_contract("con_12", "t12", 100.0, 100.0);
        completed_payment("pay_k", "con_12", 100.0, "pi_k");
        let processor = FakeProcessor::default().with_succeeded_intent("k", 10_000);
        *processor.refund_error.borrow_mut() = Some(ProcessorError::new(
            Some("charge_already_refunded"),
            "Already refunded",
            Some(400),
        ));
        let outcome = void(&processor, "con_12", automatic(0.0)).unwrap();
        assert_eq!(outcome.response.refund_results[0].status, RefundStatus::AlreadyRefunded);

        sent_contract("con_13", "t13", 100.0, 100.0);
        completed_payment("pay_l", "con_13", 100.0, "pi_l");
        let processor = FakeProcessor::default().with_succeeded_intent("l", 10_000);
        *processor.refund_error.borrow_mut() = Some(ProcessorError::transport("timeout"));
        let outcome = void(&processor, "con_13", automatic(0.0)).unwrap();
        assert_eq!(outcome.response.refund_results[0].status, RefundStatus::Failed);
        assert_eq!(outcome.response.refunds_failed, 1);
        // The contract is cancelled regardless.
        assert_eq!(outcome.response.contract.status, ContractStatus::Cancelled);
    }

    #[test]
    fn intent_lookups_classify_unrefundable_payments() {
        sent_contract("con_14", "t14", 100.0, 300.0);
        completed_payment("pay_m", "con_14", 100.0, "cs_missing");
        completed_payment("pay_n", "con_14", 100.0, "pi_n");
        completed_payment("pay_o", "con_14", 100.0, "pi_o");
        let processor = FakeProcessor::default()
            .with_succeeded_intent("n", 10_000)
            .with_succeeded_intent("o", 10_000);
        processor.intents.borrow_mut().get_mut("pi_n").unwrap().status = "processing".into();
        processor.charges.borrow_mut().get_mut("ch_o").unwrap().refunded = true;

        let outcome = void(&processor, "con_14", automatic(0.0)).unwrap();
        let statuses: Vec<RefundStatus> = outcome
            .response
            .refund_results
            .iter()
            .map(|r| r.status)
            .collect();
        assert_eq!(
            statuses,
            vec![
                RefundStatus::IntentNotFound,
                RefundStatus::NotRefundable,
                RefundStatus::AlreadyRefunded
            ]
        );
        assert!(processor.refund_requests.borrow().is_empty());
        assert_eq!(outcome.response.refunds_failed, 2);
    }

    #[test]
    fn preconditions_are_enforced_in_order() {
        sent_contract("con_15", "t15", 0.0, 100.0);
        let processor = FakeProcessor::default();
        let attempt = |caller: Principal, id: &str| {
            block_on(void_contract(
                &processor,
                caller,
                id,
                VoidContractRequest::default(),
                NOW,
            ))
        };

        assert_eq!(
            attempt(Principal::anonymous(), "con_15").unwrap_err(),
            ContractError::AuthenticationRequired
        );
        assert_eq!(
            attempt(contractor_principal(), "con_missing").unwrap_err(),
            ContractError::NotFound("Contract".into())
        );
        assert!(matches!(
            attempt(other_principal(), "con_15"),
            Err(ContractError::Forbidden(_))
        ));

        // Owner by id but registered under another company.
        let mut moved = parties::get_contractor(&contractor_principal()).unwrap();
        moved.company_id = "cmp_other".into();
        parties::insert_contractor(&moved);
        assert!(matches!(
            attempt(contractor_principal(), "con_15"),
            Err(ContractError::Forbidden(_))
        ));
        seed_parties();

        let mut done = contracts::get_contract("con_15").unwrap();
        done.status = ContractStatus::Completed;
        contracts::insert_contract(&done);
        assert!(matches!(
            attempt(contractor_principal(), "con_15"),
            Err(ContractError::InvalidState(_))
        ));
    }

    #[test]
    fn negative_fees_are_rejected() {
        sent_contract("con_16", "t16", 0.0, 100.0);
        let result = void(&FakeProcessor::default(), "con_16", automatic(-5.0));
        assert!(matches!(result, Err(ContractError::InvalidInput(_))));
        assert_eq!(
            contracts::get_contract("con_16").unwrap().status,
            ContractStatus::Sent
        );
    }
}
