#[cfg(test)]
mod test {
    use tidepool_core::errors::{ErrorKind, LedgerError};
    use tidepool_core::ledger::{Address, Amount, Role, TokenEvent, TokenLedger};
    use tidepool_core::pool::math::whole;

    fn address(tag: u8) -> Address {
        let mut bytes = [0u8; 20];
        bytes[19] = tag;
        Address(bytes)
    }

    fn minted_ledger() -> (TokenLedger, Address) {
        let admin = address(0xAD);
        let mut ledger = TokenLedger::new("Tide Token", "TIDE", admin)
            .expect("ledger construction should succeed");
        ledger
            .grant_role(admin, Role::Minter, admin)
            .expect("grant should succeed");
        ledger
            .grant_role(admin, Role::Burner, admin)
            .expect("grant should succeed");
        (ledger, admin)
    }

    #[test]
    fn test_delegated_transfers_respect_the_allowance_window() {
        let (mut ledger, admin) = minted_ledger();
        let (owner, operator, sink) = (address(1), address(2), address(3));
        ledger
            .mint(admin, owner, whole(100))
            .expect("mint should succeed");

        ledger
            .approve(owner, operator, whole(60))
            .expect("approve should succeed");
        ledger
            .transfer_from(operator, owner, sink, whole(40))
            .expect("delegated transfer should succeed");
        assert_eq!(ledger.allowance(owner, operator), whole(20));
        assert_eq!(ledger.balance_of(sink), whole(40));

        let err = ledger
            .transfer_from(operator, owner, sink, whole(30))
            .expect_err("over-allowance transfer should fail");
        assert_eq!(
            err,
            LedgerError::InsufficientAllowance {
                owner,
                spender: operator,
                available: whole(20),
                requested: whole(30),
            }
        );
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert_eq!(ledger.balance_of(sink), whole(40));

        // An unlimited approval survives any number of draws.
        ledger
            .approve(owner, operator, Amount::MAX)
            .expect("approve should succeed");
        ledger
            .transfer_from(operator, owner, sink, whole(25))
            .expect("delegated transfer should succeed");
        assert_eq!(ledger.allowance(owner, operator), Amount::MAX);
    }

    #[test]
    fn test_role_administration_end_to_end() {
        let (mut ledger, admin) = minted_ledger();
        let (keeper, outsider) = (address(1), address(2));

        let err = ledger
            .grant_role(outsider, Role::Minter, keeper)
            .expect_err("non-admin grant should fail");
        assert_eq!(err, LedgerError::NotAdmin { caller: outsider });
        assert_eq!(err.kind(), ErrorKind::Authorization);

        ledger
            .grant_role(admin, Role::Minter, keeper)
            .expect("grant should succeed");
        assert!(ledger.has_role(Role::Minter, keeper));
        ledger
            .mint(keeper, keeper, whole(5))
            .expect("minter should mint");

        ledger
            .revoke_role(admin, Role::Minter, keeper)
            .expect("revoke should succeed");
        assert!(!ledger.has_role(Role::Minter, keeper));
        let err = ledger
            .mint(keeper, keeper, whole(5))
            .expect_err("revoked minter should be refused");
        assert_eq!(
            err,
            LedgerError::MissingRole {
                caller: keeper,
                role: Role::Minter,
            }
        );

        let journal = ledger.drain_events();
        assert!(journal.contains(&TokenEvent::RoleGranted {
            role: Role::Minter,
            account: keeper,
            granted_by: admin,
        }));
        assert!(journal.contains(&TokenEvent::RoleRevoked {
            role: Role::Minter,
            account: keeper,
            revoked_by: admin,
        }));
    }

    #[test]
    fn test_supply_tracks_mints_and_burns() {
        let (mut ledger, admin) = minted_ledger();
        let holder = address(1);

        ledger
            .mint(admin, holder, whole(70))
            .expect("mint should succeed");
        ledger
            .mint(admin, admin, whole(30))
            .expect("mint should succeed");
        assert_eq!(ledger.total_supply(), whole(100));

        ledger
            .burn(admin, admin, whole(10))
            .expect("burn should succeed");
        assert_eq!(ledger.total_supply(), whole(90));
        assert_eq!(ledger.balance_of(admin), whole(20));

        // Supply equals the sum over every holder.
        let held: Amount = ledger.holders().map(|(_, balance)| balance).sum();
        assert_eq!(held, ledger.total_supply());
    }
}
