//! Message formatting utilities for client display.

use pulseband_server::infrastructure::dto::websocket::{ParticipantDto, RoomStateDto, SyncPayloadDto};
use pulseband_shared::time::timestamp_to_rfc3339;

use crate::scheduler::Beat;

/// Message formatter for client display
pub struct MessageFormatter;

impl MessageFormatter {
    /// Format the room snapshot received after joining
    pub fn format_room_snapshot(
        room: &RoomStateDto,
        participants: &[ParticipantDto],
        invite_url: &str,
        current_client_id: &str,
    ) -> String {
        let mut output = String::new();
        output.push_str("\n\n============================================================\n");
        output.push_str(&format!(
            "Room {} | {} bpm | {} | {}\n",
            room.room_id, room.tempo_bpm, room.time_signature, room.status
        ));
        output.push_str(&format!("Invite: {}\n", invite_url));
        output.push_str("Participants:\n");

        if participants.is_empty() {
            output.push_str("(No participants)\n");
        } else {
            for participant in participants {
                let me_suffix = if participant.client_id == current_client_id {
                    " (me)"
                } else {
                    ""
                };
                let instrument = participant
                    .instrument_id
                    .as_deref()
                    .map(|id| format!(" [{}]", id))
                    .unwrap_or_default();
                output.push_str(&format!(
                    "{}{}{} - joined at {}\n",
                    participant.display_name,
                    me_suffix,
                    instrument,
                    timestamp_to_rfc3339(participant.joined_at)
                ));
            }
        }

        output.push_str("============================================================\n");
        output
    }

    /// Format a participant-joined notification
    pub fn format_participant_joined(participant: &ParticipantDto) -> String {
        format!(
            "\n+ {} joined at {}\n",
            participant.display_name,
            timestamp_to_rfc3339(participant.joined_at)
        )
    }

    /// Format a participant-left notification
    pub fn format_participant_left(client_id: &str) -> String {
        format!("\n- {} left the room\n", client_id)
    }

    /// Format a participant-updated notification
    pub fn format_participant_updated(participant: &ParticipantDto) -> String {
        let instrument = participant.instrument_id.as_deref().unwrap_or("none");
        format!(
            "\n* {} now plays {}\n",
            participant.display_name, instrument
        )
    }

    /// Format a metronome-start announcement
    pub fn format_metronome_started(payload: &SyncPayloadDto) -> String {
        format!(
            "\nMetronome starting at {} ({} bpm, {})\n",
            timestamp_to_rfc3339(payload.start_at_utc),
            payload.tempo_bpm,
            payload.time_signature
        )
    }

    /// Format a metronome-stop announcement
    pub fn format_metronome_stopped() -> String {
        "\nMetronome stopped\n".to_string()
    }

    /// Format a tempo-change announcement
    pub fn format_tempo_changed(room: &RoomStateDto) -> String {
        format!("\nTempo changed to {} bpm\n", room.tempo_bpm)
    }

    /// Format a time-signature-change announcement
    pub fn format_time_signature_changed(room: &RoomStateDto) -> String {
        format!("\nTime signature changed to {}\n", room.time_signature)
    }

    /// Format one beat. The downbeat gets an accent marker.
    pub fn format_beat(beat: &Beat) -> String {
        let marker = if beat.beat_in_measure == 1 { "*" } else { "." };
        format!(
            "{} {}/{}\n",
            marker, beat.beat_in_measure, beat.beats_per_measure
        )
    }

    /// Format a server-side command rejection
    pub fn format_error(message: &str) -> String {
        format!("\n! {}\n", message)
    }

    /// Format a raw text message (when parsing fails)
    pub fn format_raw_message(text: &str) -> String {
        format!("\n← Received: {}\n", text)
    }
}
