use std::fmt;
use std::str::FromStr;

use reqwest::Method;

use interface::ExchangeError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    Public,
    Private,
}

/// Backpack REST instruction 목록. 경로/메서드/공개 여부는 컴파일 타임에 고정된다.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Instruction {
    // public
    Assets,
    Markets,
    Ticker,
    Depth,
    Klines,
    Status,
    Ping,
    Time,
    Trades,
    TradesHistory,
    // private
    BalanceQuery,
    DepositAddressQuery,
    DepositQueryAll,
    FillHistoryQueryAll,
    OrderCancel,
    OrderCancelAll,
    OrderExecute,
    OrderHistoryQueryAll,
    OrderQuery,
    OrderQueryAll,
    Withdraw,
    WithdrawalQueryAll,
    PositionQuery,
}

impl Instruction {
    pub const ALL: [Instruction; 23] = [
        Instruction::Assets,
        Instruction::Markets,
        Instruction::Ticker,
        Instruction::Depth,
        Instruction::Klines,
        Instruction::Status,
        Instruction::Ping,
        Instruction::Time,
        Instruction::Trades,
        Instruction::TradesHistory,
        Instruction::BalanceQuery,
        Instruction::DepositAddressQuery,
        Instruction::DepositQueryAll,
        Instruction::FillHistoryQueryAll,
        Instruction::OrderCancel,
        Instruction::OrderCancelAll,
        Instruction::OrderExecute,
        Instruction::OrderHistoryQueryAll,
        Instruction::OrderQuery,
        Instruction::OrderQueryAll,
        Instruction::Withdraw,
        Instruction::WithdrawalQueryAll,
        Instruction::PositionQuery,
    ];

    /// 서명 메시지와 로그에 쓰이는 이름
    pub fn name(&self) -> &'static str {
        match self {
            Instruction::Assets => "assets",
            Instruction::Markets => "markets",
            Instruction::Ticker => "ticker",
            Instruction::Depth => "depth",
            Instruction::Klines => "klines",
            Instruction::Status => "status",
            Instruction::Ping => "ping",
            Instruction::Time => "time",
            Instruction::Trades => "trades",
            Instruction::TradesHistory => "tradesHistory",
            Instruction::BalanceQuery => "balanceQuery",
            Instruction::DepositAddressQuery => "depositAddressQuery",
            Instruction::DepositQueryAll => "depositQueryAll",
            Instruction::FillHistoryQueryAll => "fillHistoryQueryAll",
            Instruction::OrderCancel => "orderCancel",
            Instruction::OrderCancelAll => "orderCancelAll",
            Instruction::OrderExecute => "orderExecute",
            Instruction::OrderHistoryQueryAll => "orderHistoryQueryAll",
            Instruction::OrderQuery => "orderQuery",
            Instruction::OrderQueryAll => "orderQueryAll",
            Instruction::Withdraw => "withdraw",
            Instruction::WithdrawalQueryAll => "withdrawalQueryAll",
            Instruction::PositionQuery => "positionQuery",
        }
    }

    /// base url 뒤에 붙는 경로
    pub fn path(&self) -> &'static str {
        match self {
            Instruction::Assets => "api/v1/assets",
            Instruction::Markets => "api/v1/markets",
            Instruction::Ticker => "api/v1/ticker",
            Instruction::Depth => "api/v1/depth",
            Instruction::Klines => "api/v1/klines",
            Instruction::Status => "api/v1/status",
            Instruction::Ping => "api/v1/ping",
            Instruction::Time => "api/v1/time",
            Instruction::Trades => "api/v1/trades",
            Instruction::TradesHistory => "api/v1/trades/history",
            Instruction::BalanceQuery => "api/v1/capital",
            Instruction::DepositAddressQuery => "wapi/v1/capital/deposit/address",
            Instruction::DepositQueryAll => "wapi/v1/capital/deposits",
            Instruction::FillHistoryQueryAll => "wapi/v1/history/fills",
            Instruction::OrderCancel | Instruction::OrderExecute | Instruction::OrderQuery => {
                "api/v1/order"
            }
            Instruction::OrderCancelAll | Instruction::OrderQueryAll => "api/v1/orders",
            Instruction::OrderHistoryQueryAll => "wapi/v1/history/orders",
            Instruction::Withdraw | Instruction::WithdrawalQueryAll => {
                "wapi/v1/capital/withdrawals"
            }
            Instruction::PositionQuery => "api/v1/position",
        }
    }

    pub fn method(&self) -> Method {
        match self {
            Instruction::OrderExecute | Instruction::Withdraw => Method::POST,
            Instruction::OrderCancel | Instruction::OrderCancelAll => Method::DELETE,
            _ => Method::GET,
        }
    }

    pub fn visibility(&self) -> Visibility {
        match self {
            Instruction::Assets
            | Instruction::Markets
            | Instruction::Ticker
            | Instruction::Depth
            | Instruction::Klines
            | Instruction::Status
            | Instruction::Ping
            | Instruction::Time
            | Instruction::Trades
            | Instruction::TradesHistory => Visibility::Public,
            _ => Visibility::Private,
        }
    }

    pub fn is_private(&self) -> bool {
        self.visibility() == Visibility::Private
    }
}

impl FromStr for Instruction {
    type Err = ExchangeError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        let instruction = match name {
            "assets" => Instruction::Assets,
            "markets" => Instruction::Markets,
            "ticker" => Instruction::Ticker,
            "depth" => Instruction::Depth,
            "klines" => Instruction::Klines,
            "status" => Instruction::Status,
            "ping" => Instruction::Ping,
            "time" => Instruction::Time,
            "trades" => Instruction::Trades,
            "tradesHistory" => Instruction::TradesHistory,
            "balanceQuery" => Instruction::BalanceQuery,
            "depositAddressQuery" => Instruction::DepositAddressQuery,
            "depositQueryAll" => Instruction::DepositQueryAll,
            "fillHistoryQueryAll" => Instruction::FillHistoryQueryAll,
            "orderCancel" => Instruction::OrderCancel,
            "orderCancelAll" => Instruction::OrderCancelAll,
            "orderExecute" => Instruction::OrderExecute,
            "orderHistoryQueryAll" => Instruction::OrderHistoryQueryAll,
            "orderQuery" => Instruction::OrderQuery,
            "orderQueryAll" => Instruction::OrderQueryAll,
            "withdraw" => Instruction::Withdraw,
            "withdrawalQueryAll" => Instruction::WithdrawalQueryAll,
            "positionQuery" => Instruction::PositionQuery,
            _ => return Err(ExchangeError::InstructionNotFound(name.to_string())),
        };
        Ok(instruction)
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_is_total() {
        for instruction in Instruction::ALL {
            assert_eq!(instruction.name().parse::<Instruction>().unwrap(), instruction);
        }

        let err = "orderTeleport".parse::<Instruction>().unwrap_err();
        assert!(matches!(err, ExchangeError::InstructionNotFound(name) if name == "orderTeleport"));
    }

    #[test]
    fn test_lookup_matches_exact_names_only() {
        assert_eq!("orderExecute".parse::<Instruction>().unwrap(), Instruction::OrderExecute);
        assert_eq!("positionQuery".parse::<Instruction>().unwrap(), Instruction::PositionQuery);

        for name in ["OrderExecute", "order_execute", " orderExecute", ""] {
            assert!(name.parse::<Instruction>().is_err(), "{:?}", name);
        }
    }

    #[test]
    fn test_registry_table() {
        let cases = [
            (Instruction::BalanceQuery, Method::GET, "api/v1/capital", Visibility::Private),
            (Instruction::OrderExecute, Method::POST, "api/v1/order", Visibility::Private),
            (Instruction::OrderCancel, Method::DELETE, "api/v1/order", Visibility::Private),
            (Instruction::OrderCancelAll, Method::DELETE, "api/v1/orders", Visibility::Private),
            (Instruction::OrderQueryAll, Method::GET, "api/v1/orders", Visibility::Private),
            (Instruction::PositionQuery, Method::GET, "api/v1/position", Visibility::Private),
            (Instruction::FillHistoryQueryAll, Method::GET, "wapi/v1/history/fills", Visibility::Private),
            (Instruction::Ticker, Method::GET, "api/v1/ticker", Visibility::Public),
            (Instruction::Trades, Method::GET, "api/v1/trades", Visibility::Public),
        ];

        for (instruction, method, path, visibility) in cases {
            assert_eq!(instruction.method(), method, "{}", instruction);
            assert_eq!(instruction.path(), path, "{}", instruction);
            assert_eq!(instruction.visibility(), visibility, "{}", instruction);
        }
    }
}
