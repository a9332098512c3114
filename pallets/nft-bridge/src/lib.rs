//! **pallet-nft-bridge**
//!
//! Source side of an NFT bridge. A token owner signs a burn request, an
//! off-chain validator authenticates the owner, derives a commitment to a
//! secret, co-signs, and submits [`Pallet::commit_and_burn`]. This pallet then:
//! - checks the caller is the configured validator,
//! - checks the owner signature over the bridge quadruple and token,
//! - checks the token still belongs to the claimed owner,
//! - checks the validator signature over the same data plus the live token URI
//!   hash, the commitment and the request timestamp,
//! - burns the token and emits [`Event::Commit`].
//!
//! The commitment is **not** stored. The `Commit` event (indexed by owner and
//! token id) is the only durable record; the destination chain consumes it
//! together with the secret the validator later reveals.
//!
//! Any failing check aborts the extrinsic, so there is never a burn without a
//! commitment nor a commitment without a burn.

#![cfg_attr(not(feature = "std"), no_std)]

use frame_support::{pallet_prelude::*, PalletId};
use frame_system::pallet_prelude::*;
use sp_runtime::traits::{AccountIdConversion, Convert, Hash};
use sp_std::prelude::*;

use nft_bridge_primitives::{
    ecdsa, messages, BridgeDomain, Commitment, EcdsaSignature, EvmAddress, NftCollection,
    TokenId,
};

pub use pallet::*;

#[cfg(test)]
mod mock;

const LOG_TARGET: &str = "runtime::nft-bridge";

#[frame_support::pallet]
pub mod pallet {
    use super::*;

    #[pallet::config]
    pub trait Config: frame_system::Config {
        /// Emit events.
        type RuntimeEvent: From<Event<Self>> + IsType<<Self as frame_system::Config>::RuntimeEvent>;

        /// Token contract the bridge burns from.
        type Collection: NftCollection;

        /// Address an account signs with. The validator origin is compared
        /// against the stored validator address through this mapping.
        type AddressMapping: Convert<Self::AccountId, EvmAddress>;

        /// Derives the bridge's own account, i.e. `from_bridge`.
        #[pallet::constant]
        type PalletId: Get<PalletId>;

        /// Origin allowed to initialize the bridge and replace the validator.
        type AdminOrigin: EnsureOrigin<Self::RuntimeOrigin>;

        /// Weight info (minimal defaults provided below).
        type WeightInfo: WeightData;
    }

    /// Minimal weights (feel free to override in runtime).
    pub trait WeightData {
        fn initialize() -> Weight;
        fn set_validator() -> Weight;
        fn commit_and_burn() -> Weight;
    }
    impl WeightData for () {
        fn initialize() -> Weight {
            Weight::from_parts(20_000, 0)
        }
        fn set_validator() -> Weight {
            Weight::from_parts(15_000, 0)
        }
        // two signature recoveries, a URI read and a burn
        fn commit_and_burn() -> Weight {
            Weight::from_parts(250_000, 0)
        }
    }

    #[pallet::pallet]
    pub struct Pallet<T>(_);

    /// Source/destination quadruple, written once by `initialize`.
    #[pallet::storage]
    #[pallet::getter(fn domain)]
    pub type Domain<T: Config> = StorageValue<_, BridgeDomain, OptionQuery>;

    /// Address whose signatures finalize commitments.
    #[pallet::storage]
    #[pallet::getter(fn validator)]
    pub type Validator<T: Config> = StorageValue<_, EvmAddress, OptionQuery>;

    // --------------------------- Events / Errors --------------------------------------

    #[pallet::event]
    #[pallet::generate_deposit(pub(super) fn deposit_event)]
    pub enum Event<T: Config> {
        /// Bridge pair configured.
        Initialized {
            from_token: EvmAddress,
            from_bridge: EvmAddress,
            to_token: EvmAddress,
            to_bridge: EvmAddress,
        },
        /// Validator identity replaced; signatures by `old` no longer verify.
        ValidatorUpdated {
            old: Option<EvmAddress>,
            new: EvmAddress,
        },
        /// Token burned against `commitment`. Topics: owner and token id.
        Commit {
            token_owner: EvmAddress,
            token_id: TokenId,
            commitment: Commitment,
            request_timestamp: u64,
            validator_signature: EcdsaSignature,
        },
    }

    #[pallet::error]
    pub enum Error<T> {
        /// `initialize` has not run yet.
        NotInitialized,
        /// `initialize` already ran.
        AlreadyInitialized,
        /// No validator has been set.
        ValidatorNotSet,
        /// Caller is not the configured validator.
        NotValidator,
        /// Owner signature does not recover to `token_owner`.
        InvalidOwnerSignature,
        /// Validator signature does not recover to the configured validator.
        InvalidValidatorSignature,
        /// The collection has no such token.
        TokenNotFound,
        /// Live owner differs from `token_owner` (or the token is gone).
        OwnershipMismatch,
        /// The collection refused to burn.
        BurnFailed,
    }

    // --------------------------- Helpers ----------------------------------------------

    impl<T: Config> Pallet<T> {
        #[inline]
        pub fn bridge_account() -> T::AccountId {
            T::PalletId::get().into_account_truncating()
        }

        /// `from_bridge` as it appears in signed messages.
        #[inline]
        pub fn bridge_address() -> EvmAddress {
            T::AddressMapping::convert(Self::bridge_account())
        }

        fn commit_topics(token_owner: &EvmAddress, token_id: &TokenId) -> [T::Hash; 2] {
            [
                T::Hashing::hash_of(&(b"owner", token_owner)),
                T::Hashing::hash_of(&(b"token", token_id)),
            ]
        }
    }

    // --------------------------- Calls -------------------------------------------------

    #[pallet::call]
    impl<T: Config> Pallet<T> {
        /// Fix the bridge pair. `from_bridge` is this pallet's own address.
        #[pallet::call_index(0)]
        #[pallet::weight(T::WeightInfo::initialize())]
        pub fn initialize(
            origin: OriginFor<T>,
            from_token: EvmAddress,
            to_token: EvmAddress,
            to_bridge: EvmAddress,
        ) -> DispatchResult {
            T::AdminOrigin::ensure_origin(origin)?;
            ensure!(!Domain::<T>::exists(), Error::<T>::AlreadyInitialized);

            let from_bridge = Self::bridge_address();
            Domain::<T>::put(BridgeDomain {
                from_token,
                from_bridge,
                to_token,
                to_bridge,
            });
            log::info!(
                target: LOG_TARGET,
                "bridge initialized: {from_token:?} -> {to_token:?} via {to_bridge:?}"
            );

            Self::deposit_event(Event::Initialized {
                from_token,
                from_bridge,
                to_token,
                to_bridge,
            });
            Ok(())
        }

        /// Replace the validator. Takes effect immediately; commitments signed
        /// by the previous validator and not yet submitted become unusable.
        #[pallet::call_index(1)]
        #[pallet::weight(T::WeightInfo::set_validator())]
        pub fn set_validator(origin: OriginFor<T>, new_validator: EvmAddress) -> DispatchResult {
            T::AdminOrigin::ensure_origin(origin)?;
            let old = Validator::<T>::get();
            Validator::<T>::put(new_validator);
            log::info!(target: LOG_TARGET, "validator set to {new_validator:?}");

            Self::deposit_event(Event::ValidatorUpdated {
                old,
                new: new_validator,
            });
            Ok(())
        }

        /// Burn `token_id` and publish `commitment` for it.
        ///
        /// Only the validator may call this. The owner's burn request must
        /// verify, `token_owner` must still own the token, and the validator's
        /// commit message must verify against the live token URI.
        #[pallet::call_index(2)]
        #[pallet::weight(T::WeightInfo::commit_and_burn())]
        pub fn commit_and_burn(
            origin: OriginFor<T>,
            token_owner: EvmAddress,
            token_id: TokenId,
            commitment: Commitment,
            request_timestamp: u64,
            owner_signature: EcdsaSignature,
            validator_signature: EcdsaSignature,
        ) -> DispatchResult {
            let who = ensure_signed(origin)?;
            let domain = Domain::<T>::get().ok_or(Error::<T>::NotInitialized)?;
            let validator = Validator::<T>::get().ok_or(Error::<T>::ValidatorNotSet)?;
            ensure!(
                T::AddressMapping::convert(who) == validator,
                Error::<T>::NotValidator
            );

            // 1) Owner authorized burning this token on this bridge pair.
            let request = messages::burn_request_digest(&domain, &token_owner, &token_id);
            if !ecdsa::verify(&token_owner, &request, &owner_signature) {
                log::debug!(target: LOG_TARGET, "owner signature rejected for token {token_id}");
                return Err(Error::<T>::InvalidOwnerSignature.into());
            }

            // 2) Token has not changed hands (or been burned) since the request was signed.
            ensure!(
                T::Collection::owner_of(&domain.from_token, token_id) == Some(token_owner),
                Error::<T>::OwnershipMismatch
            );

            // 3) Validator committed to exactly this token snapshot.
            let token_uri = T::Collection::token_uri(&domain.from_token, token_id)
                .ok_or(Error::<T>::TokenNotFound)?;
            let commit = messages::commit_digest(
                &domain,
                &token_owner,
                &token_id,
                &token_uri,
                &commitment,
                request_timestamp,
            );
            if !ecdsa::verify(&validator, &commit, &validator_signature) {
                log::debug!(target: LOG_TARGET, "validator signature rejected for token {token_id}");
                return Err(Error::<T>::InvalidValidatorSignature.into());
            }

            // 4) Irreversible.
            T::Collection::burn(&domain.from_token, token_id)
                .map_err(|_| Error::<T>::BurnFailed)?;
            log::info!(target: LOG_TARGET, "burned token {token_id} of {token_owner:?}");

            let topics = Self::commit_topics(&token_owner, &token_id);
            let event: <T as Config>::RuntimeEvent = Event::<T>::Commit {
                token_owner,
                token_id,
                commitment,
                request_timestamp,
                validator_signature,
            }
            .into();
            frame_system::Pallet::<T>::deposit_event_indexed(&topics, event.into());
            Ok(())
        }
    }
}
