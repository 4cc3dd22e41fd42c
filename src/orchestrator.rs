// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Transfer Pipeline
//!
//! Runs one Initia bank transfer signed by a custodial EVM vault:
//!
//! 1. Sign a fixed derivation message, recover the vault's public key and
//!    check it against the configured vault address.
//! 2. Look up account number and sequence.
//! 3. Build the Amino sign document and canonicalize it once.
//! 4. Have the vault sign those bytes as an EIP-191 personal message and
//!    check the signer of the returned signature.
//! 5. Drop the recovery byte and assemble the protobuf transaction.
//! 6. Broadcast and confirm.
//!
//! Every step consumes the previous step's output; nothing runs in parallel.
//! Failures before broadcast are errors. From broadcast on, the result is a
//! [`BroadcastOutcome`] carried in the [`TransferReport`].

use alloy::primitives::Address;
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::broadcast::{
    AccountInfo, AccountSequence, BroadcastConfirmer, BroadcastOutcome, ChainClient, ConfirmPolicy,
};
use crate::chain::initia::{
    bech32_from_evm, NetworkConfig, SignedTx, TransferRequest, UnsignedTransfer,
};
use crate::config::{SignerConfig, TransferConfig};
use crate::crypto::{recover_checked, CompressedPublicKey, RawSignatureBlob, INITIA_ETH_SECP256K1};
use crate::error::PipelineError;
use crate::signer::{MessageSigner, RemoteSignerError, SignRequestEnvelope};

/// Personal message signed to learn the vault's public key.
pub const DERIVATION_MESSAGE: &str = "Initia public key derivation";

/// Which vault signs, and under which EVM chain tag requests are scoped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VaultIdentity {
    pub vault_id: String,
    pub address: Address,
    pub evm_chain: String,
}

impl From<&SignerConfig> for VaultIdentity {
    fn from(config: &SignerConfig) -> Self {
        Self {
            vault_id: config.vault_id.clone(),
            address: config.vault_address,
            evm_chain: config.evm_chain.clone(),
        }
    }
}

/// Result of one transfer run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransferReport {
    pub network: &'static str,
    pub from_address: String,
    pub to_address: String,
    pub amount: String,
    pub denom: &'static str,
    pub public_key: String,
    pub account_number: u64,
    pub sequence: u64,
    pub signer_transaction_id: Option<String>,
    pub outcome: BroadcastOutcome,
    pub explorer_url: Option<String>,
}

impl TransferReport {
    /// Process exit code: 0 success, 2 timed out, 1 anything else.
    pub fn exit_code(&self) -> u8 {
        match self.outcome {
            BroadcastOutcome::ConfirmedSuccess { .. } => 0,
            BroadcastOutcome::TimedOut { .. } | BroadcastOutcome::Pending { .. } => 2,
            BroadcastOutcome::ConfirmedFailure { .. }
            | BroadcastOutcome::SubmissionRejected { .. } => 1,
        }
    }
}

/// Wires the signer, the Initia chain collaborator and the confirmer.
pub struct TransferPipeline<S, C> {
    signer: S,
    confirmer: BroadcastConfirmer<C>,
    network: &'static NetworkConfig,
    vault: VaultIdentity,
}

impl<S, C> TransferPipeline<S, C>
where
    S: MessageSigner,
    C: ChainClient<SignedTx = SignedTx> + AccountSequence,
{
    pub fn new(
        signer: S,
        chain: C,
        network: &'static NetworkConfig,
        vault: VaultIdentity,
        policy: ConfirmPolicy,
    ) -> Self {
        Self {
            signer,
            confirmer: BroadcastConfirmer::new(chain).with_policy(policy),
            network,
            vault,
        }
    }

    pub fn signer(&self) -> &S {
        &self.signer
    }

    pub fn chain(&self) -> &C {
        self.confirmer.client()
    }

    pub fn network(&self) -> &'static NetworkConfig {
        self.network
    }

    /// The vault's Initia account address.
    pub fn account_address(&self) -> Result<String, PipelineError> {
        Ok(bech32_from_evm(&self.vault.address, self.network.address_prefix)?)
    }

    async fn sign_personal_message(
        &self,
        message: &str,
    ) -> Result<(RawSignatureBlob, Option<String>), PipelineError> {
        let envelope = SignRequestEnvelope::evm_personal_message(
            self.vault.vault_id.as_str(),
            self.vault.evm_chain.as_str(),
            message,
        );
        envelope.validate()?;

        let result = self.signer.submit(&envelope).await?;
        let Some(blob) = result.first_signature().copied() else {
            return Err(RemoteSignerError::NoSignatures {
                state: result
                    .raw_state
                    .clone()
                    .unwrap_or_else(|| "unknown".to_string()),
            }
            .into());
        };
        if result.signatures.len() > 1 {
            debug!(
                count = result.signatures.len(),
                "Remote signer returned extra signatures; using the first"
            );
        }
        Ok((blob, result.transaction_id))
    }

    /// Recover the vault's compressed public key.
    ///
    /// The recovered address must equal the configured vault address, so a
    /// signer that answers for a different key fails here rather than at
    /// broadcast.
    pub async fn derive_public_key(&self) -> Result<CompressedPublicKey, PipelineError> {
        let (blob, _) = self.sign_personal_message(DERIVATION_MESSAGE).await?;
        let public_key = recover_checked(DERIVATION_MESSAGE.as_bytes(), &blob, self.vault.address)?;
        info!(
            vault_address = %self.vault.address,
            public_key = %public_key.to_hex(),
            "Derived vault public key"
        );
        Ok(public_key)
    }

    /// Bind the transfer to the account's current number and sequence.
    pub async fn prepare_transfer(
        &self,
        transfer: &TransferConfig,
        public_key: CompressedPublicKey,
    ) -> Result<UnsignedTransfer, PipelineError> {
        let from_address = self.account_address()?;
        let account: AccountInfo = self.chain().account_info(&from_address).await?;
        info!(
            address = %from_address,
            account_number = account.account_number,
            sequence = account.sequence,
            "Fetched account info"
        );

        let request = TransferRequest {
            from_address,
            to_address: transfer.destination.clone(),
            amount: transfer.amount.clone(),
            gas_limit: transfer.gas_limit,
            fee_amount: transfer.fee_amount.clone(),
            memo: transfer.memo.clone(),
        };
        Ok(UnsignedTransfer::new(self.network, request, account, public_key)?)
    }

    /// Sign the canonical sign document and assemble the transaction.
    pub async fn sign_transfer(
        &self,
        unsigned: &UnsignedTransfer,
    ) -> Result<(SignedTx, Option<String>), PipelineError> {
        let sign_doc = unsigned.sign_doc().canonical_bytes()?;
        debug!(sign_doc = %sign_doc, "Canonical sign document");

        let (blob, transaction_id) = self.sign_personal_message(sign_doc.as_str()).await?;
        recover_checked(sign_doc.as_bytes(), &blob, self.vault.address)?;

        let signature = blob.reconstruct(&INITIA_ETH_SECP256K1)?;
        let signed = unsigned.assemble(&signature)?;
        info!(
            tx_hash = %signed.tx_hash,
            signer_transaction_id = ?transaction_id,
            "Assembled signed transaction"
        );
        Ok((signed, transaction_id))
    }

    async fn prepare_and_sign(
        &self,
        transfer: &TransferConfig,
    ) -> Result<(CompressedPublicKey, UnsignedTransfer, SignedTx, Option<String>), PipelineError> {
        let public_key = self.derive_public_key().await?;
        let unsigned = self.prepare_transfer(transfer, public_key).await?;
        let (signed, signer_transaction_id) = self.sign_transfer(&unsigned).await?;
        Ok((public_key, unsigned, signed, signer_transaction_id))
    }

    /// Run the whole transfer. `observe` sees every confirmation step.
    ///
    /// Cancelling `shutdown` before broadcast returns
    /// [`PipelineError::Cancelled`]; after broadcast it ends observation with
    /// a timed-out outcome.
    pub async fn run<F>(
        &self,
        transfer: &TransferConfig,
        shutdown: &CancellationToken,
        observe: F,
    ) -> Result<TransferReport, PipelineError>
    where
        F: FnMut(&BroadcastOutcome) + Send,
    {
        // Signing may wait on approval indefinitely; an interrupt before
        // broadcast abandons the attempt.
        let (public_key, unsigned, signed, signer_transaction_id) = tokio::select! {
            biased;
            _ = shutdown.cancelled() => return Err(PipelineError::Cancelled),
            prepared = self.prepare_and_sign(transfer) => prepared?,
        };

        let outcome = self
            .confirmer
            .broadcast_and_confirm_until(&signed, shutdown, observe)
            .await;
        let explorer_url = outcome
            .tx_hash()
            .map(|hash| self.network.explorer_tx_url(hash));

        match &outcome {
            BroadcastOutcome::ConfirmedSuccess { .. } => {
                info!(state = outcome.state_name(), explorer = ?explorer_url, "Transfer confirmed")
            }
            _ => warn!(
                state = outcome.state_name(),
                tx_hash = ?outcome.tx_hash(),
                raw_log = ?outcome.raw_log(),
                explorer = ?explorer_url,
                "Transfer did not confirm successfully"
            ),
        }

        let request = unsigned.request();
        let account = unsigned.account();
        Ok(TransferReport {
            network: self.network.name,
            from_address: request.from_address.clone(),
            to_address: request.to_address.clone(),
            amount: request.amount.clone(),
            denom: self.network.denom,
            public_key: public_key.to_base64(),
            account_number: account.account_number,
            sequence: account.sequence,
            signer_transaction_id,
            outcome,
            explorer_url,
        })
    }
}
