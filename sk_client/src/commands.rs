use schafkopf::{Card, ContractBid, ContractType, SortMode, Suit};
use std::fmt;

/// A line of console input, parsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Play(Card),
    Pass,
    Bid(ContractBid),
    /// Change the hand ordering.
    Sort(SortMode),
    /// Capture the hand as currently shown as the custom order.
    CaptureCustom,
    /// Request a fresh snapshot.
    Refresh,
    Help,
    Quit,
}

/// Errors that can occur during command parsing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// `play` without a card.
    MissingCard,
    /// Card text that does not name a card.
    InvalidCard(String),
    /// Malformed `bid` command.
    InvalidBid(String),
    /// Unknown sort mode.
    InvalidSortMode(String),
    /// Unrecognized command.
    UnrecognizedCommand(String),
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingCard => write!(f, "Play requires a card (e.g., 'play herz ace')"),
            Self::InvalidCard(reason) => write!(f, "Invalid card: {reason}"),
            Self::InvalidBid(reason) => write!(
                f,
                "Invalid bid: {reason}. Use 'bid rufer SUIT', 'bid wenz [SUIT]' or 'bid solo SUIT'"
            ),
            Self::InvalidSortMode(mode) => write!(
                f,
                "Unknown sort mode '{mode}'. Use suit, rank, trump or custom"
            ),
            Self::UnrecognizedCommand(cmd) => write!(
                f,
                "Unrecognized command '{cmd}'. Type 'help' to see available commands"
            ),
        }
    }
}

impl std::error::Error for ParseError {}

pub const HELP: &str = "\
Commands:
  play SUIT RANK      Play a card (e.g., 'play herz ace', 'play g 10')
  pass                Pass during bidding
  bid rufer SUIT      Call the ace of SUIT (not herz)
  bid wenz [SUIT]     Wenz, optionally with a trump suit
  bid solo SUIT       Solo with SUIT as trump
  sort MODE           Order the hand by suit, rank, trump or custom
  custom              Keep the hand order as currently shown
  state               Ask the server for a fresh game state
  help                Show this help
  quit                Leave the game
";

/// Parse a console line into a [`Command`].
///
/// # Examples
///
/// ```
/// use sk_client::commands::{parse_command, Command};
/// use schafkopf::{Card, ContractBid, Rank, Suit};
///
/// assert_eq!(parse_command("pass"), Ok(Command::Pass));
/// assert_eq!(
///     parse_command("play herz ace"),
///     Ok(Command::Play(Card::new(Suit::Herz, Rank::Ace)))
/// );
/// assert_eq!(
///     parse_command("bid solo gras"),
///     Ok(Command::Bid(ContractBid::solo(Suit::Gras)))
/// );
/// ```
pub fn parse_command(input: &str) -> Result<Command, ParseError> {
    let trimmed = input.trim();
    let lowered = trimmed.to_ascii_lowercase();

    // Try single-word commands first
    match lowered.as_str() {
        "pass" | "p" => return Ok(Command::Pass),
        "custom" => return Ok(Command::CaptureCustom),
        "state" | "refresh" => return Ok(Command::Refresh),
        "help" | "?" => return Ok(Command::Help),
        "quit" | "exit" | "q" => return Ok(Command::Quit),
        _ => {}
    }

    // Parse multi-word commands
    let parts: Vec<&str> = lowered.split_ascii_whitespace().collect();
    match parts.first() {
        Some(&"play") => parse_play_command(&parts),
        Some(&"bid") => parse_bid_command(&parts),
        Some(&"sort") => parse_sort_command(&parts),
        _ => Err(ParseError::UnrecognizedCommand(trimmed.to_string())),
    }
}

/// Parse a play command: "play SUIT RANK"
fn parse_play_command(parts: &[&str]) -> Result<Command, ParseError> {
    if parts.len() < 2 {
        return Err(ParseError::MissingCard);
    }
    parts[1..]
        .join(" ")
        .parse::<Card>()
        .map(Command::Play)
        .map_err(|e| ParseError::InvalidCard(e.to_string()))
}

/// Parse a bid command: "bid CONTRACT [SUIT]"
fn parse_bid_command(parts: &[&str]) -> Result<Command, ParseError> {
    let contract = parts
        .get(1)
        .ok_or_else(|| ParseError::InvalidBid("missing contract".to_string()))?
        .parse::<ContractType>()
        .map_err(|e| ParseError::InvalidBid(e.to_string()))?;
    let suit = parts
        .get(2)
        .map(|s| s.parse::<Suit>())
        .transpose()
        .map_err(|e| ParseError::InvalidBid(e.to_string()))?;
    if parts.len() > 3 {
        return Err(ParseError::InvalidBid("too many arguments".to_string()));
    }

    let bid = match (contract, suit) {
        (ContractType::Rufer, Some(ace)) => ContractBid::rufer(ace),
        (ContractType::Rufer, None) => {
            return Err(ParseError::InvalidBid("a Rufer must call an ace".to_string()));
        }
        (ContractType::Wenz, suit) => ContractBid::wenz(suit),
        (ContractType::Solo, Some(suit)) => ContractBid::solo(suit),
        (ContractType::Solo, None) => {
            return Err(ParseError::InvalidBid("a Solo needs a trump suit".to_string()));
        }
    };
    bid.validate()
        .map_err(|e| ParseError::InvalidBid(e.to_string()))?;
    Ok(Command::Bid(bid))
}

/// Parse a sort command: "sort MODE"
fn parse_sort_command(parts: &[&str]) -> Result<Command, ParseError> {
    match parts.get(1) {
        Some(mode) => mode
            .parse::<SortMode>()
            .map(Command::Sort)
            .map_err(|_| ParseError::InvalidSortMode(mode.to_string())),
        None => Err(ParseError::InvalidSortMode(String::new())),
    }
}
