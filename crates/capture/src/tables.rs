//! The fixed set of tracked chain-state tables.

/// A chain-state table captured into the delta payload.
///
/// Names and capture order are part of the wire contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TrackedTable {
    /// On-chain accounts.
    Account,
    /// Contract table registry; containers for the `Contract*` row tables.
    ContractTable,
    /// Primary key/value contract rows.
    ContractRow,
    /// 64-bit secondary index rows.
    ContractIndex64,
    /// 128-bit secondary index rows.
    ContractIndex128,
    /// 256-bit secondary index rows.
    ContractIndex256,
    /// Double secondary index rows.
    ContractIndexDouble,
    /// Long-double secondary index rows.
    ContractIndexLongDouble,
    /// Global chain properties.
    GlobalProperty,
    /// Deferred transactions.
    GeneratedTransaction,
    /// Account permissions.
    Permission,
    /// Permission links.
    PermissionLink,
    /// Per-account resource limits.
    ResourceLimits,
    /// Per-account resource usage.
    ResourceUsage,
    /// Aggregate resource limit state.
    ResourceLimitsState,
    /// Resource limit configuration.
    ResourceLimitsConfig,
}

impl TrackedTable {
    /// Every tracked table, in capture order.
    pub const ALL: [Self; 16] = [
        Self::Account,
        Self::ContractTable,
        Self::ContractRow,
        Self::ContractIndex64,
        Self::ContractIndex128,
        Self::ContractIndex256,
        Self::ContractIndexDouble,
        Self::ContractIndexLongDouble,
        Self::GlobalProperty,
        Self::GeneratedTransaction,
        Self::Permission,
        Self::PermissionLink,
        Self::ResourceLimits,
        Self::ResourceUsage,
        Self::ResourceLimitsState,
        Self::ResourceLimitsConfig,
    ];

    /// Wire name of the table.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Account => "account",
            Self::ContractTable => "contract_table",
            Self::ContractRow => "contract_row",
            Self::ContractIndex64 => "contract_index64",
            Self::ContractIndex128 => "contract_index128",
            Self::ContractIndex256 => "contract_index256",
            Self::ContractIndexDouble => "contract_index_double",
            Self::ContractIndexLongDouble => "contract_index_long_double",
            Self::GlobalProperty => "global_property",
            Self::GeneratedTransaction => "generated_transaction",
            Self::Permission => "permission",
            Self::PermissionLink => "permission_link",
            Self::ResourceLimits => "resource_limits",
            Self::ResourceUsage => "resource_usage",
            Self::ResourceLimitsState => "resource_limits_state",
            Self::ResourceLimitsConfig => "resource_limits_config",
        }
    }

    /// Whether rows of this table are encoded together with their resolved
    /// containing `contract_table` record.
    pub const fn has_container(self) -> bool {
        matches!(
            self,
            Self::ContractRow
                | Self::ContractIndex64
                | Self::ContractIndex128
                | Self::ContractIndex256
                | Self::ContractIndexDouble
                | Self::ContractIndexLongDouble
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capture_order_is_fixed() {
        let names: Vec<_> = TrackedTable::ALL.iter().map(|t| t.name()).collect();
        assert_eq!(
            names,
            [
                "account",
                "contract_table",
                "contract_row",
                "contract_index64",
                "contract_index128",
                "contract_index256",
                "contract_index_double",
                "contract_index_long_double",
                "global_property",
                "generated_transaction",
                "permission",
                "permission_link",
                "resource_limits",
                "resource_usage",
                "resource_limits_state",
                "resource_limits_config",
            ],
        );
    }

    #[test]
    fn only_contract_row_tables_have_containers() {
        let with_container =
            TrackedTable::ALL.iter().filter(|t| t.has_container()).count();
        assert_eq!(with_container, 6);
        assert!(!TrackedTable::ContractTable.has_container());
    }
}
