//! Seat billing schema.
//!
//! Creates the seat plan, change history and member directory tables, the
//! partial unique index that allows at most one scheduled downgrade per
//! organization, and the trigger that keeps history rows immutable apart from
//! the `scheduled -> applied` transition.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();

        db.execute_unprepared(ENUMS_SQL).await?;
        db.execute_unprepared(SEAT_PLANS_SQL).await?;
        db.execute_unprepared(SEAT_PLAN_CHANGES_SQL).await?;
        db.execute_unprepared(ORGANIZATION_MEMBERS_SQL).await?;
        db.execute_unprepared(IMMUTABILITY_TRIGGER_SQL).await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();
        db.execute_unprepared(DROP_ALL_SQL).await?;
        Ok(())
    }
}

// ============================================================
// SQL CONSTANTS
// ============================================================

const ENUMS_SQL: &str = r"
CREATE TYPE billing_interval AS ENUM ('monthly', 'yearly');

CREATE TYPE seat_plan_status AS ENUM ('active', 'inactive');

CREATE TYPE seat_change_action AS ENUM ('upgrade', 'downgrade');

CREATE TYPE seat_change_status AS ENUM ('scheduled', 'applied');

CREATE TYPE member_role AS ENUM ('owner', 'manager', 'broker', 'assistant');
";

const SEAT_PLANS_SQL: &str = r"
CREATE TABLE seat_plans (
    organization_id         UUID PRIMARY KEY,
    seat_limit              INTEGER NOT NULL,
    billing_cycle_anchor    TIMESTAMPTZ NOT NULL,
    billing_cycle_interval  billing_interval NOT NULL DEFAULT 'monthly',
    status                  seat_plan_status NOT NULL DEFAULT 'active',
    created_at              TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    updated_at              TIMESTAMPTZ NOT NULL DEFAULT NOW(),

    CONSTRAINT chk_seat_plans_limit CHECK (seat_limit BETWEEN 0 AND 1000000)
);
";

const SEAT_PLAN_CHANGES_SQL: &str = r"
CREATE TABLE seat_plan_changes (
    id                        UUID PRIMARY KEY,
    organization_id           UUID NOT NULL REFERENCES seat_plans(organization_id),
    requested_by              UUID NOT NULL,
    action                    seat_change_action NOT NULL,
    status                    seat_change_status NOT NULL,
    old_limit                 INTEGER NOT NULL,
    new_limit                 INTEGER NOT NULL,
    effective_at              TIMESTAMPTZ NOT NULL,
    currency_code             VARCHAR(3) NOT NULL,
    unit_price_cents          BIGINT NOT NULL,
    prorated_amount_cents     BIGINT NOT NULL DEFAULT 0,
    proration_days_total      INTEGER NOT NULL,
    proration_days_remaining  INTEGER NOT NULL,
    notes                     TEXT,
    metadata                  JSONB NOT NULL DEFAULT '{}'::jsonb,
    created_at                TIMESTAMPTZ NOT NULL DEFAULT NOW(),

    CONSTRAINT chk_seat_changes_limits CHECK (
        old_limit BETWEEN 0 AND 1000000 AND new_limit BETWEEN 0 AND 1000000
    ),
    CONSTRAINT chk_seat_changes_currency CHECK (currency_code ~ '^[A-Z]{3}$'),
    CONSTRAINT chk_seat_changes_price CHECK (unit_price_cents >= 0),
    CONSTRAINT chk_seat_changes_prorated CHECK (prorated_amount_cents >= 0),
    CONSTRAINT chk_seat_changes_days CHECK (
        proration_days_remaining >= 0 AND proration_days_remaining <= proration_days_total
    ),
    CONSTRAINT chk_seat_changes_notes CHECK (notes IS NULL OR char_length(notes) <= 1000),
    CONSTRAINT chk_seat_changes_direction CHECK (
        (action = 'upgrade' AND new_limit > old_limit) OR
        (action = 'downgrade' AND new_limit < old_limit)
    ),
    CONSTRAINT chk_seat_changes_upgrade_applied CHECK (action = 'downgrade' OR status = 'applied'),
    CONSTRAINT chk_seat_changes_downgrade_free CHECK (action = 'upgrade' OR prorated_amount_cents = 0)
);

-- At most one pending downgrade per organization
CREATE UNIQUE INDEX uq_seat_plan_changes_scheduled_downgrade
    ON seat_plan_changes (organization_id)
    WHERE action = 'downgrade' AND status = 'scheduled';

-- History listing, newest first
CREATE INDEX idx_seat_plan_changes_history
    ON seat_plan_changes (organization_id, created_at DESC, id DESC);

-- Reconciler scan
CREATE INDEX idx_seat_plan_changes_due
    ON seat_plan_changes (effective_at)
    WHERE action = 'downgrade' AND status = 'scheduled';
";

const ORGANIZATION_MEMBERS_SQL: &str = r"
CREATE TABLE organization_members (
    organization_id  UUID NOT NULL,
    user_id          UUID NOT NULL,
    role             member_role NOT NULL,
    is_active        BOOLEAN NOT NULL DEFAULT TRUE,
    created_at       TIMESTAMPTZ NOT NULL DEFAULT NOW(),

    PRIMARY KEY (organization_id, user_id)
);

CREATE INDEX idx_organization_members_seats
    ON organization_members (organization_id)
    WHERE role = 'broker' AND is_active;
";

const IMMUTABILITY_TRIGGER_SQL: &str = r"
CREATE OR REPLACE FUNCTION guard_seat_plan_change()
RETURNS TRIGGER AS $$
BEGIN
    IF TG_OP = 'DELETE' THEN
        RAISE EXCEPTION 'seat_plan_changes rows cannot be deleted';
    END IF;

    IF OLD.status = 'scheduled' AND NEW.status = 'applied'
        AND (NEW.id, NEW.organization_id, NEW.requested_by, NEW.action, NEW.old_limit,
             NEW.new_limit, NEW.effective_at, NEW.currency_code, NEW.unit_price_cents,
             NEW.prorated_amount_cents, NEW.proration_days_total, NEW.proration_days_remaining,
             NEW.created_at)
            IS NOT DISTINCT FROM
            (OLD.id, OLD.organization_id, OLD.requested_by, OLD.action, OLD.old_limit,
             OLD.new_limit, OLD.effective_at, OLD.currency_code, OLD.unit_price_cents,
             OLD.prorated_amount_cents, OLD.proration_days_total, OLD.proration_days_remaining,
             OLD.created_at)
    THEN
        RETURN NEW;
    END IF;

    RAISE EXCEPTION 'seat_plan_changes rows are immutable except scheduled -> applied';
END;
$$ LANGUAGE plpgsql;

CREATE TRIGGER trg_seat_plan_changes_guard
    BEFORE UPDATE OR DELETE ON seat_plan_changes
    FOR EACH ROW EXECUTE FUNCTION guard_seat_plan_change();
";

const DROP_ALL_SQL: &str = r"
DROP TRIGGER IF EXISTS trg_seat_plan_changes_guard ON seat_plan_changes;
DROP FUNCTION IF EXISTS guard_seat_plan_change();
DROP TABLE IF EXISTS organization_members;
DROP TABLE IF EXISTS seat_plan_changes;
DROP TABLE IF EXISTS seat_plans;
DROP TYPE IF EXISTS member_role;
DROP TYPE IF EXISTS seat_change_status;
DROP TYPE IF EXISTS seat_change_action;
DROP TYPE IF EXISTS seat_plan_status;
DROP TYPE IF EXISTS billing_interval;
";
