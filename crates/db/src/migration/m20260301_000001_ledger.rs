//! Initial ledger schema.
//!
//! Creates balance holders, the monetary and stock ledgers, tariffs, credit
//! obligations, job line items, the deferred transaction queue and the audit
//! log. Postings are append-only; uniqueness of references and reversals is
//! enforced here as well as in the engine.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();

        // ============================================================
        // PART 1: HOLDERS
        // ============================================================
        db.execute_unprepared(BALANCE_HOLDERS_SQL).await?;

        // ============================================================
        // PART 2: LEDGERS
        // ============================================================
        db.execute_unprepared(LEDGER_ENTRIES_SQL).await?;
        db.execute_unprepared(STOCK_ENTRIES_SQL).await?;

        // ============================================================
        // PART 3: TARIFFS
        // ============================================================
        db.execute_unprepared(TARIFFS_SQL).await?;
        db.execute_unprepared(CHARGES_SQL).await?;
        db.execute_unprepared(CHARGE_SPLITS_SQL).await?;

        // ============================================================
        // PART 4: CREDIT, JOBS, QUEUE, AUDIT
        // ============================================================
        db.execute_unprepared(CREDIT_OBLIGATIONS_SQL).await?;
        db.execute_unprepared(JOB_LINE_ITEMS_SQL).await?;
        db.execute_unprepared(PENDING_TRANSACTIONS_SQL).await?;
        db.execute_unprepared(AUDIT_LOG_SQL).await?;

        // ============================================================
        // PART 5: IMMUTABILITY
        // ============================================================
        db.execute_unprepared(IMMUTABILITY_SQL).await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();
        db.execute_unprepared(DROP_ALL_SQL).await?;
        Ok(())
    }
}

const BALANCE_HOLDERS_SQL: &str = r"
CREATE TABLE balance_holders (
    id UUID PRIMARY KEY,
    owner_reference VARCHAR(100) NOT NULL UNIQUE,
    name VARCHAR(255) NOT NULL,
    kind VARCHAR(20) NOT NULL,
    scope_group VARCHAR(100),
    minimum_balance NUMERIC(19, 4),
    is_service BOOLEAN NOT NULL DEFAULT false,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    CONSTRAINT chk_holder_kind CHECK (
        kind IN ('entity', 'vendor', 'customer', 'commission', 'item')
    ),
    CONSTRAINT chk_service_is_item CHECK (NOT is_service OR kind = 'item'),
    CONSTRAINT chk_no_monetary_floor_on_items CHECK (
        minimum_balance IS NULL OR kind <> 'item'
    )
);

CREATE INDEX idx_holders_scope_group ON balance_holders(scope_group);
";

const LEDGER_ENTRIES_SQL: &str = r"
CREATE TABLE ledger_entries (
    id UUID PRIMARY KEY,
    sequence BIGSERIAL NOT NULL UNIQUE,
    reference VARCHAR(100) NOT NULL,
    label VARCHAR(30),
    amount NUMERIC(19, 4) NOT NULL,
    debit_holder_id UUID NOT NULL REFERENCES balance_holders(id),
    credit_holder_id UUID NOT NULL REFERENCES balance_holders(id),
    movement_type VARCHAR(20) NOT NULL,
    payment_method VARCHAR(50) NOT NULL,
    scope VARCHAR(100) NOT NULL,
    reversal_of VARCHAR(100),
    correlation VARCHAR(100),
    dimension VARCHAR(100),
    description VARCHAR(500),
    phone VARCHAR(30),
    posted_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    accounting_period CHAR(7) NOT NULL,
    CONSTRAINT chk_amount_positive CHECK (amount > 0),
    CONSTRAINT chk_distinct_holders CHECK (debit_holder_id <> credit_holder_id)
);

CREATE UNIQUE INDEX uq_le_reference_label ON ledger_entries(reference, COALESCE(label, ''));
CREATE UNIQUE INDEX uq_le_reversal_of ON ledger_entries(reversal_of) WHERE reversal_of IS NOT NULL;
CREATE INDEX idx_le_debit_holder ON ledger_entries(debit_holder_id, sequence);
CREATE INDEX idx_le_credit_holder ON ledger_entries(credit_holder_id, sequence);
CREATE INDEX idx_le_correlation ON ledger_entries(correlation) WHERE correlation IS NOT NULL;
CREATE INDEX idx_le_period ON ledger_entries(accounting_period);
";

const STOCK_ENTRIES_SQL: &str = r"
CREATE TABLE stock_entries (
    id UUID PRIMARY KEY,
    sequence BIGSERIAL NOT NULL UNIQUE,
    reference VARCHAR(100) NOT NULL UNIQUE,
    quantity BIGINT NOT NULL,
    debit_holder_id UUID NOT NULL REFERENCES balance_holders(id),
    credit_holder_id UUID NOT NULL REFERENCES balance_holders(id),
    category VARCHAR(20) NOT NULL,
    scope VARCHAR(100) NOT NULL,
    reversal_of VARCHAR(100),
    job_id UUID,
    description VARCHAR(500),
    posted_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    accounting_period CHAR(7) NOT NULL,
    CONSTRAINT chk_quantity_positive CHECK (quantity > 0),
    CONSTRAINT chk_stock_distinct_holders CHECK (debit_holder_id <> credit_holder_id),
    CONSTRAINT chk_stock_category CHECK (category IN ('sale', 'purchase', 'reversal'))
);

CREATE UNIQUE INDEX uq_se_reversal_of ON stock_entries(reversal_of) WHERE reversal_of IS NOT NULL;
CREATE INDEX idx_se_debit_holder ON stock_entries(debit_holder_id, sequence);
CREATE INDEX idx_se_credit_holder ON stock_entries(credit_holder_id, sequence);
";

const TARIFFS_SQL: &str = r"
CREATE TABLE tariffs (
    id UUID PRIMARY KEY,
    code VARCHAR(50) NOT NULL,
    movement_type VARCHAR(20) NOT NULL,
    payment_method VARCHAR(50) NOT NULL,
    scope VARCHAR(100) NOT NULL,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    UNIQUE (movement_type, payment_method, scope)
);
";

const CHARGES_SQL: &str = r"
CREATE TABLE charges (
    id UUID PRIMARY KEY,
    tariff_id UUID NOT NULL REFERENCES tariffs(id) ON DELETE CASCADE,
    min_value NUMERIC(19, 4) NOT NULL,
    max_value NUMERIC(19, 4) NOT NULL,
    charge_type VARCHAR(20) NOT NULL,
    amount NUMERIC(19, 4) NOT NULL,
    CONSTRAINT chk_charge_range CHECK (min_value >= 0 AND min_value < max_value),
    CONSTRAINT chk_charge_type CHECK (charge_type IN ('flat', 'percentage'))
);

CREATE INDEX idx_charges_tariff ON charges(tariff_id, min_value);
";

const CHARGE_SPLITS_SQL: &str = r"
CREATE TABLE charge_splits (
    id UUID PRIMARY KEY,
    tariff_id UUID NOT NULL REFERENCES tariffs(id) ON DELETE CASCADE,
    position INTEGER NOT NULL,
    percentage NUMERIC(7, 4) NOT NULL,
    destination_holder_id UUID NOT NULL REFERENCES balance_holders(id),
    UNIQUE (tariff_id, position),
    CONSTRAINT chk_split_percentage CHECK (percentage > 0 AND percentage <= 100)
);
";

const CREDIT_OBLIGATIONS_SQL: &str = r"
CREATE TABLE credit_obligations (
    id UUID PRIMARY KEY,
    reference VARCHAR(100) NOT NULL UNIQUE,
    kind VARCHAR(30) NOT NULL,
    amount NUMERIC(19, 4) NOT NULL,
    payment_method VARCHAR(50) NOT NULL,
    settlement_owner VARCHAR(100) NOT NULL,
    counterparty_owner VARCHAR(100) NOT NULL,
    scope VARCHAR(100) NOT NULL,
    on_credit BOOLEAN NOT NULL,
    credit_status VARCHAR(10) NOT NULL,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    CONSTRAINT chk_obligation_amount CHECK (amount > 0),
    CONSTRAINT chk_credit_status CHECK (credit_status IN ('NONE', 'PENDING', 'PARTIAL', 'PAID'))
);
";

const JOB_LINE_ITEMS_SQL: &str = r"
CREATE TABLE job_line_items (
    id UUID PRIMARY KEY,
    job_id UUID NOT NULL,
    item_holder_id UUID NOT NULL REFERENCES balance_holders(id),
    quantity BIGINT NOT NULL,
    stock_entry_id UUID NOT NULL REFERENCES stock_entries(id),
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    UNIQUE (job_id, item_holder_id)
);
";

const PENDING_TRANSACTIONS_SQL: &str = r"
CREATE TABLE pending_transactions (
    id UUID PRIMARY KEY,
    request JSONB NOT NULL,
    status VARCHAR(10) NOT NULL DEFAULT 'PENDING',
    reason TEXT,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    processed_at TIMESTAMPTZ,
    CONSTRAINT chk_pending_status CHECK (status IN ('PENDING', 'PROCESSED', 'FAILED'))
);

CREATE INDEX idx_pending_queue ON pending_transactions(created_at) WHERE status = 'PENDING';
";

const AUDIT_LOG_SQL: &str = r"
CREATE TABLE audit_log (
    id UUID PRIMARY KEY,
    record_type VARCHAR(50) NOT NULL,
    record_id VARCHAR(100) NOT NULL,
    action VARCHAR(10) NOT NULL,
    snapshot JSONB NOT NULL,
    recorded_at TIMESTAMPTZ NOT NULL DEFAULT now()
);

CREATE INDEX idx_audit_record ON audit_log(record_id, recorded_at);
";

const IMMUTABILITY_SQL: &str = r"
CREATE OR REPLACE FUNCTION reject_posting_change()
RETURNS TRIGGER AS $$
BEGIN
    RAISE EXCEPTION 'Postings are immutable; post a reversal instead';
END;
$$ LANGUAGE plpgsql;

CREATE TRIGGER trg_ledger_entries_immutable
    BEFORE UPDATE OR DELETE ON ledger_entries
    FOR EACH ROW EXECUTE FUNCTION reject_posting_change();

CREATE TRIGGER trg_stock_entries_immutable
    BEFORE UPDATE OR DELETE ON stock_entries
    FOR EACH ROW EXECUTE FUNCTION reject_posting_change();
";

const DROP_ALL_SQL: &str = r"
DROP TRIGGER IF EXISTS trg_stock_entries_immutable ON stock_entries;
DROP TRIGGER IF EXISTS trg_ledger_entries_immutable ON ledger_entries;
DROP FUNCTION IF EXISTS reject_posting_change();

DROP TABLE IF EXISTS audit_log CASCADE;
DROP TABLE IF EXISTS pending_transactions CASCADE;
DROP TABLE IF EXISTS job_line_items CASCADE;
DROP TABLE IF EXISTS credit_obligations CASCADE;
DROP TABLE IF EXISTS charge_splits CASCADE;
DROP TABLE IF EXISTS charges CASCADE;
DROP TABLE IF EXISTS tariffs CASCADE;
DROP TABLE IF EXISTS stock_entries CASCADE;
DROP TABLE IF EXISTS ledger_entries CASCADE;
DROP TABLE IF EXISTS balance_holders CASCADE;
";
