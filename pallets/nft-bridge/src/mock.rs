use crate::pallet as pallet_nft_bridge;
use frame_support::{
    construct_runtime, derive_impl, parameter_types, storage_alias, Blake2_128Concat, PalletId,
};
use nft_bridge_primitives::{EvmAddress, NftCollection, TokenId};
use sp_runtime::{traits::IdentityLookup, BuildStorage, DispatchError, DispatchResult};

pub type AccountId = EvmAddress;

pub const FROM_TOKEN: EvmAddress = EvmAddress::repeat_byte(0xf0);
pub const TO_TOKEN: EvmAddress = EvmAddress::repeat_byte(0x70);
pub const TO_BRIDGE: EvmAddress = EvmAddress::repeat_byte(0x7b);

// --- Storage-backed token collection ----------------------------------------
// Lives in externalities so a reverted extrinsic also reverts the burn.

#[storage_alias]
pub type Owners = StorageMap<MockNfts, Blake2_128Concat, (EvmAddress, TokenId), EvmAddress>;

#[storage_alias]
pub type Uris = StorageMap<MockNfts, Blake2_128Concat, (EvmAddress, TokenId), Vec<u8>>;

/// Tokens whose burn the collection refuses.
#[storage_alias]
pub type Frozen = StorageMap<MockNfts, Blake2_128Concat, (EvmAddress, TokenId), ()>;

pub struct MockCollection;

impl MockCollection {
    pub fn mint(collection: EvmAddress, id: TokenId, owner: EvmAddress, uri: &[u8]) {
        Owners::insert((collection, id), owner);
        Uris::insert((collection, id), uri.to_vec());
    }

    pub fn transfer(collection: EvmAddress, id: TokenId, to: EvmAddress) {
        Owners::insert((collection, id), to);
    }

    pub fn freeze(collection: EvmAddress, id: TokenId) {
        Frozen::insert((collection, id), ());
    }
}

impl NftCollection for MockCollection {
    fn owner_of(collection: &EvmAddress, token_id: TokenId) -> Option<EvmAddress> {
        Owners::get((*collection, token_id))
    }

    fn token_uri(collection: &EvmAddress, token_id: TokenId) -> Option<Vec<u8>> {
        Uris::get((*collection, token_id))
    }

    fn burn(collection: &EvmAddress, token_id: TokenId) -> DispatchResult {
        let key = (*collection, token_id);
        if Frozen::contains_key(key) {
            return Err(DispatchError::Other("token frozen"));
        }
        Owners::take(key).ok_or(DispatchError::Other("no such token"))?;
        Uris::remove(key);
        Ok(())
    }
}

#[derive_impl(frame_system::config_preludes::TestDefaultConfig)]
impl frame_system::Config for Runtime {
    type Block = frame_system::mocking::MockBlock<Runtime>;
    type AccountId = AccountId;
    type Lookup = IdentityLookup<AccountId>;
}

parameter_types! {
    pub const NftBridgePalletId: PalletId = PalletId(*b"NftBrdge");
}

impl pallet_nft_bridge::Config for Runtime {
    type RuntimeEvent = RuntimeEvent;
    type Collection = MockCollection;
    type AddressMapping = sp_runtime::traits::Identity;
    type PalletId = NftBridgePalletId;
    type AdminOrigin = frame_system::EnsureRoot<AccountId>;
    type WeightInfo = ();
}

construct_runtime!(
    pub enum Runtime {
        System: frame_system,
        NftBridge: pallet_nft_bridge,
    }
);

// Build a fresh externalities for each test.
pub fn new_test_ext() -> sp_io::TestExternalities {
    let t = frame_system::GenesisConfig::<Runtime>::default()
        .build_storage()
        .unwrap();
    let mut ext = sp_io::TestExternalities::new(t);
    ext.execute_with(|| System::set_block_number(1));
    ext
}
